//! Offline quote source.
//!
//! Each symbol follows a small random walk: every fetch moves the last price by a
//! uniform step in `[-1%, +1%]`, floored at `0.01`. Walks start from the asset's
//! reference level (or a caller-provided one) and are shared by every caller, so
//! all readers observe the same sequence.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use price_common::tickers::Ticker;
use price_common::{PriceSample, Result};
use rand::Rng;

use super::QuoteFetcher;

/// Walk start for symbols that are not a known `Ticker`.
const DEFAULT_START_PRICE: f64 = 100.0;
/// Lowest price the walk may produce.
const PRICE_FLOOR: f64 = 0.01;

/// Random-walk quote source for running without network access.
#[derive(Debug, Default)]
pub struct SimulatedFetcher {
    last_prices: Mutex<HashMap<String, f64>>,
    start_prices: HashMap<String, f64>,
}

impl SimulatedFetcher {
    /// Create a source seeded from each ticker's reference level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the walk start for `symbol`.
    pub fn with_start_price(mut self, symbol: &str, price: f64) -> Self {
        self.start_prices.insert(symbol.to_string(), price);
        self
    }

    /// Next step of a random walk around `current_price`.
    pub fn next_price(current_price: f64) -> f64 {
        let mut rng = rand::rng();
        let change: f64 = rng.random_range(-0.01..0.01);
        let new_price = current_price * (1.0 + change);
        new_price.max(PRICE_FLOOR)
    }

    fn start_price(&self, symbol: &str) -> f64 {
        self.start_prices.get(symbol).copied().unwrap_or_else(|| {
            symbol
                .parse::<Ticker>()
                .map(|ticker| ticker.reference_price())
                .unwrap_or(DEFAULT_START_PRICE)
        })
    }
}

impl QuoteFetcher for SimulatedFetcher {
    fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let mut prices = self.last_prices.lock()?;
        let start = self.start_price(symbol);
        let last = prices.entry(symbol.to_string()).or_insert(start);
        *last = Self::next_price(*last);
        Ok(*last)
    }

    /// One sample per minute over `window`, ending at the walk's current price.
    fn fetch_history(&self, symbol: &str, window: Duration) -> Result<Vec<PriceSample>> {
        let minutes = (window.as_secs() / 60) as usize;
        let now = Utc::now();
        let anchor = {
            let prices = self.last_prices.lock()?;
            prices
                .get(symbol)
                .copied()
                .unwrap_or_else(|| self.start_price(symbol))
        };

        // Walk backwards from the anchor, then emit oldest first.
        let mut price = anchor;
        let mut samples: Vec<PriceSample> = (1..=minutes)
            .map(|ago| {
                price = Self::next_price(price);
                PriceSample::new(now - chrono::Duration::minutes(ago as i64), price)
            })
            .collect();
        samples.reverse();
        Ok(samples)
    }
}

//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use price_common::{PriceSample, Result, TrackerError};
use price_tracker::QuoteFetcher;
use price_tracker::HistoryStore;

/// Replays scripted prices per symbol; an exhausted or unknown symbol fails.
#[derive(Default)]
pub struct ScriptedFetcher {
    prices: Mutex<HashMap<String, VecDeque<f64>>>,
    history: HashMap<String, Vec<PriceSample>>,
    history_fails: bool,
    pub price_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(self, symbol: &str, prices: &[f64]) -> Self {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), prices.iter().copied().collect());
        self
    }

    pub fn with_history(mut self, symbol: &str, prices: &[f64]) -> Self {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let samples = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceSample::new(start + chrono::Duration::minutes(i as i64), *p))
            .collect();
        self.history.insert(symbol.to_string(), samples);
        self
    }

    pub fn with_failing_history(mut self) -> Self {
        self.history_fails = true;
        self
    }
}

impl QuoteFetcher for ScriptedFetcher {
    fn fetch_price(&self, symbol: &str) -> Result<f64> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .lock()?
            .get_mut(symbol)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TrackerError::Fetch(format!("no quote for {symbol}")))
    }

    fn fetch_history(&self, symbol: &str, _window: Duration) -> Result<Vec<PriceSample>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.history_fails {
            return Err(TrackerError::Fetch("history endpoint down".to_string()));
        }
        Ok(self.history.get(symbol).cloned().unwrap_or_default())
    }
}

/// Constant price with no history support, optionally slow; tracks concurrency.
pub struct SlowFetcher {
    delay: Duration,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub calls: AtomicUsize,
}

impl SlowFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl QuoteFetcher for SlowFetcher {
    fn fetch_price(&self, _symbol: &str) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(42.0)
    }
}

/// History store whose saves always fail.
pub struct BrokenHistoryStore;

impl HistoryStore for BrokenHistoryStore {
    fn save(&self, symbol: &str, _samples: &[PriceSample]) -> Result<()> {
        Err(TrackerError::Persist(format!("{symbol}: disk full")))
    }

    fn load(&self, symbol: &str) -> Result<Vec<PriceSample>> {
        Err(TrackerError::Persist(format!("{symbol}: unreadable")))
    }
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

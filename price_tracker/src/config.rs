//! Runtime configuration consumed by the tracker library.
//!
//! The binary builds a `TrackerConfig` from its command line; tests and embedders
//! start from `TrackerConfig::default()` and override fields.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use price_common::defaults::{
    COINAPI_BASE_URL, DATA_DIR, HISTORY_CAPACITY, HTTP_TIMEOUT_SECS, QUOTE_CURRENCY,
    REFRESH_INTERVAL_SECS, STATUS_INTERVAL_SECS,
};
use price_common::tickers::Ticker;
use price_common::{ReferencePolicy, Result, TrackerError};
use strum::Display;

use crate::fetcher::{CoinApiFetcher, QuoteFetcher, SimulatedFetcher};
use crate::history_store::FileHistoryStore;

/// Where quotes come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase")]
pub enum QuoteSource {
    /// CoinAPI exchange-rate REST API.
    #[default]
    CoinApi,
    /// Offline random walk.
    Simulated,
}

/// Everything needed to run the tracker.
#[derive(Clone)]
pub struct TrackerConfig {
    /// Symbols refreshed each cycle.
    pub symbols: Vec<String>,
    /// Time between refresh cycle starts.
    pub interval: Duration,
    /// Points retained per symbol.
    pub capacity: usize,
    /// Directory of per-symbol history files.
    pub data_dir: PathBuf,
    /// How the 24h reference is chosen for a short window.
    pub reference_policy: ReferencePolicy,
    /// Backfill a cold symbol from the quote source before its first live fetch.
    pub backfill: bool,
    /// Time between status lines.
    pub status_interval: Duration,
    /// Quote source.
    pub source: QuoteSource,
    /// API key passed to the HTTP source.
    pub api_key: Option<String>,
    /// Base URL of the HTTP source.
    pub base_url: String,
    /// Currency the symbols are quoted in.
    pub quote_currency: String,
    /// Connect/request timeout for the HTTP source.
    pub http_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            symbols: [Ticker::BTC, Ticker::ETH, Ticker::SOL]
                .iter()
                .map(Ticker::symbol)
                .collect(),
            interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            capacity: HISTORY_CAPACITY,
            data_dir: PathBuf::from(DATA_DIR),
            reference_policy: ReferencePolicy::default(),
            backfill: true,
            status_interval: Duration::from_secs(STATUS_INTERVAL_SECS),
            source: QuoteSource::default(),
            api_key: None,
            base_url: COINAPI_BASE_URL.to_string(),
            quote_currency: QUOTE_CURRENCY.to_string(),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("symbols", &self.symbols)
            .field("interval", &self.interval)
            .field("capacity", &self.capacity)
            .field("data_dir", &self.data_dir)
            .field("reference_policy", &self.reference_policy)
            .field("backfill", &self.backfill)
            .field("source", &self.source)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TrackerConfig {
    /// Check the values a run cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(TrackerError::Format("no symbols to track".to_string()));
        }
        if let Some(blank) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(TrackerError::InvalidSymbol(blank.clone()));
        }
        if self.interval.is_zero() {
            return Err(TrackerError::Format("refresh interval must be positive".to_string()));
        }
        if self.capacity == 0 {
            return Err(TrackerError::Format("history capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Quote source selected by `source`.
    pub fn build_fetcher(&self) -> Result<Arc<dyn QuoteFetcher>> {
        match self.source {
            QuoteSource::CoinApi => {
                let api_key = self
                    .api_key
                    .as_deref()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        TrackerError::Format("the coinapi source needs an API key".to_string())
                    })?;
                Ok(Arc::new(CoinApiFetcher::with_options(
                    &self.base_url,
                    api_key,
                    &self.quote_currency,
                    self.http_timeout,
                )?))
            }
            QuoteSource::Simulated => Ok(Arc::new(SimulatedFetcher::new())),
        }
    }

    /// File history store rooted at `data_dir`.
    pub fn history_store(&self) -> FileHistoryStore {
        FileHistoryStore::new(&self.data_dir)
    }
}

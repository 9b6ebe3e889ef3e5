//! Quote sources.
//!
//! A `QuoteFetcher` delivers the current rate for a symbol and, optionally, a
//! time-bounded series used to backfill a cold symbol. Implementations must be
//! callable from several worker threads at once and should bound every network
//! call with a timeout so shutdown never waits on a wedged request.
//!
//! - `coinapi` — blocking HTTP client for the CoinAPI exchange-rate endpoints.
//! - `simulated` — offline random-walk source.

use std::time::Duration;

use price_common::{PriceSample, Result, TrackerError};

pub mod coinapi;
pub mod simulated;

pub use coinapi::CoinApiFetcher;
pub use simulated::SimulatedFetcher;

/// Source of live and historical quotes.
pub trait QuoteFetcher: Send + Sync {
    /// Fetch the current rate for `symbol`.
    fn fetch_price(&self, symbol: &str) -> Result<f64>;

    /// Fetch samples covering the trailing `window`, oldest first.
    fn fetch_history(&self, symbol: &str, _window: Duration) -> Result<Vec<PriceSample>> {
        Err(TrackerError::Unsupported(format!(
            "history backfill for {symbol}"
        )))
    }
}

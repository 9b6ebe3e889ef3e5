//! Default constants shared by the tracker library and binary.

use std::time::Duration;

/// Points retained per symbol: 24 hours at 1-minute granularity.
pub const HISTORY_CAPACITY: usize = 1440;
/// Seconds between refresh cycle starts.
pub const REFRESH_INTERVAL_SECS: u64 = 60;
/// Seconds between status lines printed by the binary.
pub const STATUS_INTERVAL_SECS: u64 = 30;
/// Connect and request timeout for the HTTP quote source.
pub const HTTP_TIMEOUT_SECS: u64 = 10;
/// Directory holding one history file per symbol.
pub const DATA_DIR: &str = "data";
/// Suffix appended to the symbol to form its history file name.
pub const HISTORY_FILE_SUFFIX: &str = "_history.txt";
/// Base URL of the CoinAPI REST service.
pub const COINAPI_BASE_URL: &str = "https://rest.coinapi.io";
/// Currency every symbol is quoted in.
pub const QUOTE_CURRENCY: &str = "USD";
/// Fractional digits written for persisted prices.
pub const PRICE_PRECISION: usize = 10;

/// Window requested from the quote source when backfilling a cold symbol.
pub fn backfill_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

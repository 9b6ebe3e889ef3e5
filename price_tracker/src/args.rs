//! Command-line arguments for the price tracker.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use price_common::defaults::{
    COINAPI_BASE_URL, DATA_DIR, HISTORY_CAPACITY, HTTP_TIMEOUT_SECS, QUOTE_CURRENCY,
    REFRESH_INTERVAL_SECS, STATUS_INTERVAL_SECS,
};
use price_common::tickers::{Ticker, TickerParser};
use price_common::{ReferencePolicy, Result, TrackerError};
use price_tracker::{QuoteSource, TrackerConfig};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Assets to track, comma separated.
    #[clap(long, value_enum, value_delimiter = ',', default_values_t = [Ticker::BTC, Ticker::ETH, Ticker::SOL])]
    pub symbols: Vec<Ticker>,

    /// Text file with assets to track; replaces `--symbols`.
    /// Tickers may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub symbols_file: Option<PathBuf>,

    /// Seconds between refresh cycles.
    #[clap(long, default_value_t = REFRESH_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Directory of per-symbol history files.
    #[clap(long, default_value = DATA_DIR)]
    pub data_dir: PathBuf,

    /// Quote source.
    #[clap(long, value_enum, default_value_t = QuoteSource::CoinApi)]
    pub source: QuoteSource,

    /// CoinAPI key.
    #[clap(long, env = "COINAPI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the CoinAPI service.
    #[clap(long, default_value = COINAPI_BASE_URL)]
    pub base_url: String,

    /// Currency the assets are quoted in.
    #[clap(long, default_value = QUOTE_CURRENCY)]
    pub quote_currency: String,

    /// How the 24h reference is chosen while the window is not yet full.
    #[clap(long, value_enum, default_value_t = ReferencePolicy::OldestInWindow)]
    pub reference_policy: ReferencePolicy,

    /// Do not backfill cold symbols from the quote source.
    #[clap(long)]
    pub no_backfill: bool,

    /// Points retained per symbol.
    #[clap(long, default_value_t = HISTORY_CAPACITY)]
    pub capacity: usize,

    /// Seconds between status lines.
    #[clap(long, default_value_t = STATUS_INTERVAL_SECS)]
    pub status_secs: u64,

    /// Connect/request timeout for the quote source, in seconds.
    #[clap(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,
}

impl Args {
    /// Resolve the ticker set and build the library configuration.
    pub fn into_config(self) -> Result<TrackerConfig> {
        let tickers = match &self.symbols_file {
            Some(path) => {
                let file = File::open(normalize_path(path)).map_err(|e| {
                    TrackerError::ParseTickersFile(format!("{}: {e}", path.display()))
                })?;
                Ticker::parse_from_file(BufReader::new(file))?
            }
            None => self.symbols.clone(),
        };

        Ok(TrackerConfig {
            symbols: tickers.iter().map(Ticker::symbol).collect(),
            interval: Duration::from_secs(self.interval_secs),
            capacity: self.capacity,
            data_dir: self.data_dir,
            reference_policy: self.reference_policy,
            backfill: !self.no_backfill,
            status_interval: Duration::from_secs(self.status_secs.max(1)),
            source: self.source,
            api_key: self.api_key,
            base_url: self.base_url,
            quote_currency: self.quote_currency,
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        })
    }
}

/// Strip surrounding whitespace and matching quotes from a CLI-provided path.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &Path) -> PathBuf {
    let raw = raw.to_string_lossy();
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_track_three_assets() {
        let config = Args::parse_from(["price_tracker"]).into_config().unwrap();
        assert_eq!(config.symbols, vec!["BTC", "ETH", "SOL"]);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert!(config.backfill);
    }

    #[test]
    fn parses_symbol_list_and_flags() {
        let args = Args::parse_from([
            "price_tracker",
            "--symbols",
            "btc,doge",
            "--source",
            "simulated",
            "--reference-policy",
            "full-window-only",
            "--no-backfill",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.symbols, vec!["BTC", "DOGE"]);
        assert_eq!(config.source, QuoteSource::Simulated);
        assert_eq!(config.reference_policy, ReferencePolicy::FullWindowOnly);
        assert!(!config.backfill);
    }

    #[test]
    fn strips_quotes_from_paths() {
        let path = normalize_path(&PathBuf::from("  \"data/tickers.txt\" "));
        assert_eq!(path, PathBuf::from("data/tickers.txt"));
    }
}

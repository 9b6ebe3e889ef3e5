//! Tracked asset symbols and ticker-list parsing.

use clap::ValueEnum;
use std::io::BufRead;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::TrackerError;

/// Trait providing ticker-list parsing.
pub trait TickerParser {
    /// Parses tickers from a buffered reader.
    ///
    /// Tokens may be separated by commas, whitespace, or new lines; each token is
    /// parsed as a single `Ticker` value using `FromStr`. Duplicates are dropped,
    /// keeping the first occurrence. Returns an error if any token cannot be parsed.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Ticker>, TrackerError>;
}

impl TickerParser for Ticker {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, TrackerError> {
        let mut tickers = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(TrackerError::Io)?;
            let tokens = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty());

            for token in tokens {
                match token.parse::<Self>() {
                    Ok(ticker) if !tickers.contains(&ticker) => tickers.push(ticker),
                    Ok(_) => {}
                    Err(e) => {
                        return Err(TrackerError::ParseTickersFile(format!("{token}: {e}")));
                    }
                }
            }
        }
        Ok(tickers)
    }
}

impl Ticker {
    /// Symbol string used as the price store key (upper-case code).
    pub fn symbol(&self) -> String {
        self.to_string()
    }

    /// Rough USD level used to seed simulated quotes for this asset.
    pub fn reference_price(&self) -> f64 {
        match self {
            Ticker::BTC => 60_000.0,
            Ticker::ETH => 3_000.0,
            Ticker::BNB => 550.0,
            Ticker::SOL => 150.0,
            Ticker::LTC => 80.0,
            Ticker::AVAX => 30.0,
            Ticker::LINK => 15.0,
            Ticker::DOT => 6.0,
            Ticker::XRP | Ticker::ADA | Ticker::MATIC => 0.5,
            Ticker::DOGE | Ticker::TRX => 0.12,
        }
    }
}

/// Set of supported crypto assets.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    ValueEnum,
    Display,
    EnumString,
    EnumIter,
    Hash,
    Eq,
    PartialEq,
)]
#[clap(rename_all = "lower")]
#[strum(ascii_case_insensitive)]
pub enum Ticker {
    BTC,
    ETH,
    BNB,
    SOL,
    XRP,
    ADA,
    DOGE,
    TRX,
    DOT,
    MATIC,
    LTC,
    AVAX,
    LINK,
}

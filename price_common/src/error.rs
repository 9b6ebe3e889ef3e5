//! Error types shared by the tracker library and binary.
//!
//! The `TrackerError` enum unifies the failure cases of the system: I/O and
//! persistence problems, quote-source failures, malformed text/JSON, and misuse of
//! the price store (empty symbols, non-finite prices). Crates propagate this single
//! error type through the [`crate::Result`] alias.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared across the workspace.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// I/O error originating from the standard library (files, directories).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// A store mutation was attempted with an empty or blank symbol.
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// A store mutation was attempted with a NaN or infinite price.
    #[error("Invalid price for {symbol}: {price}")]
    InvalidPrice {
        /// Symbol the price was meant for.
        symbol: String,
        /// The rejected value.
        price: f64,
    },

    /// Error while parsing a ticker list into `Ticker` values.
    #[error("Parse tickers file error: {0}")]
    ParseTickersFile(String),

    /// The quote source could not deliver a price or series (network, status, body).
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Durable storage rejected a save or load.
    #[error("Persistence error: {0}")]
    Persist(String),

    /// The collaborator does not implement the requested capability.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for TrackerError {
    fn from(err: PoisonError<T>) -> Self {
        TrackerError::MutexLock(err.to_string())
    }
}

//!
//! Common types and utilities shared by the price tracker library and binary.
//!
//! This crate aggregates:
//! - `error` — unified error type `TrackerError` used across the workspace.
//! - `result` — handy `Result<T, TrackerError>` alias.
//! - `tickers` — the tracked asset symbols and ticker-list parsing.
//! - `price_point` — `PricePoint` observations and `(timestamp, price)` samples.
//! - `metrics` — 24h change computation and reference-point selection.
//! - `defaults` — default constants for capacity, cadence, and storage.
#![warn(missing_docs)]
pub mod defaults;
pub mod error;
pub mod metrics;
pub mod price_point;
pub mod result;
pub mod tickers;

pub use error::TrackerError;
pub use metrics::{Change24h, ReferencePolicy};
pub use price_point::{PricePoint, PriceSample};
pub use result::Result;

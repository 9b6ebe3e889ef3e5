//! Live and historical price tracking.
//!
//! The tracker keeps the latest quote and a bounded trailing window per symbol,
//! refreshed on a timer from an external quote source and persisted to durable
//! storage. The building blocks:
//!
//! - `model::price_store` — `PriceStore`, the thread-safe cache readers query.
//! - `scheduler` — `RefreshScheduler`, the periodic driver that fetches, derives the
//!   24h change, writes the store, and persists each symbol's window.
//! - `fetcher` — the `QuoteFetcher` capability with HTTP and simulated sources.
//! - `history_store` — the `HistoryStore` capability with file and memory backends.
//! - `config` — `TrackerConfig`, everything a run is parameterized by.
#![warn(missing_docs)]
pub mod config;
pub mod fetcher;
pub mod history_store;
pub mod model;
pub mod scheduler;

pub use config::{QuoteSource, TrackerConfig};
pub use fetcher::QuoteFetcher;
pub use history_store::HistoryStore;
pub use model::price_store::PriceStore;
pub use scheduler::{RefreshScheduler, SchedulerHandle};

//! Domain models of the tracker.
//!
//! - `price_store` — the concurrent, bounded per-symbol price cache shared by the
//!   refresh scheduler (writer) and every reader.

pub mod price_store;

pub use price_store::{PriceStore, SymbolSnapshot, WindowStats};

//! Price tracker daemon.
//!
//! This binary keeps the latest quote and a trailing 24h window for a fixed set of
//! crypto assets. It wires together the library's building blocks:
//!
//! - `PriceStore` — the shared in-memory cache, seeded at startup from the history
//!   files left by a previous run.
//! - `RefreshScheduler` — a background driver that polls the quote source on a
//!   fixed cadence, updates the store, and rewrites each symbol's history file.
//! - Status loop — the main thread reads the store on its own cadence and logs one
//!   line per symbol, concurrently with the scheduler's writes.
//!
//! Shutdown: Ctrl+C signals the main loop, which stops the scheduler and waits for
//! in-flight fetches to finish (each bounded by the HTTP timeout).
//!
//! Usage example (CLI):
//! ```bash
//! COINAPI_KEY=... price_tracker --symbols btc,eth --interval-secs 60
//! price_tracker --source simulated --symbols-file ./tickers.txt --interval-secs 5
//! ```
#![warn(missing_docs)]
mod args;

use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::{bounded, select, tick};
use log::info;
use price_common::Result;
use price_common::TrackerError;
use price_tracker::history_store::HistoryStore;
use price_tracker::model::PriceStore;
use price_tracker::scheduler::{RefreshScheduler, seed_from_store};

use crate::args::Args;

fn main() -> Result<(), TrackerError> {
    init_logger();
    let config = Args::parse().into_config()?;
    config.validate()?;
    info!(
        "Tracking {} via {} every {:?}",
        config.symbols.join(","),
        config.source,
        config.interval
    );

    let store = Arc::new(PriceStore::with_capacity(config.capacity));
    let history: Arc<dyn HistoryStore> = Arc::new(config.history_store());
    let seeded = seed_from_store(&store, history.as_ref(), &config.symbols);
    info!(
        "Restored history for {} of {} symbol(s) from {}",
        seeded,
        config.symbols.len(),
        config.data_dir.display()
    );

    let fetcher = config.build_fetcher()?;

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down tracker...");
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| TrackerError::Format(format!("Error setting Ctrl+C handler: {e}")))?;

    let scheduler =
        RefreshScheduler::from_config(&config, Arc::clone(&store), fetcher, Arc::clone(&history))
            .start()?;

    let status = tick(config.status_interval);
    loop {
        select! {
            recv(shutdown_rx) -> _ => break,
            recv(status) -> _ => log_status(&store, &config.symbols),
        }
    }

    scheduler.stop();
    log_status(&store, &config.symbols);
    info!("Tracker stopped");
    Ok(())
}

/// Log one line per symbol from a consistent snapshot of the store.
fn log_status(store: &PriceStore, symbols: &[String]) {
    for symbol in symbols {
        let snapshot = store.snapshot(symbol);
        if snapshot.current_price == 0.0 {
            info!("{}: waiting for first quote ({} stored points)", symbol, snapshot.history.len());
            continue;
        }
        let latest = snapshot.latest;
        info!(
            "{}: Price={:.4} 24h={:+.4} ({:+.2}%) Start={:.4} Points={} Time={}",
            symbol,
            snapshot.current_price,
            latest.price_change_24h,
            latest.percent_change_24h,
            snapshot.starting_price,
            snapshot.history.len(),
            latest.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

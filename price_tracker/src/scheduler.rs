//! Periodic refresh of the price store.
//!
//! The `RefreshScheduler` runs a driver thread that wakes on a fixed cadence
//! (`crossbeam_channel::tick`, measured between cycle starts) and fans each cycle
//! out into one worker thread per symbol. A worker fetches the symbol's rate,
//! derives the 24h change, writes the store, and persists the updated window.
//!
//! Concurrency and shutdown:
//! - Each symbol has an in-flight flag, so at most one worker per symbol exists. A
//!   symbol whose previous worker is still running is skipped for that cycle.
//! - The driver owns every worker `JoinHandle`, reaps finished ones on each tick,
//!   and joins the rest on shutdown. Workers are never detached.
//! - `SchedulerHandle::stop` (or dropping the handle) disconnects the stop channel;
//!   the driver observes it between cycles and returns after in-flight workers
//!   finish their current fetch. Writes to the store are never interrupted.
//!
//! Failures are absorbed: a failed fetch skips the symbol until the next cycle and
//! a failed save leaves the in-memory window authoritative. Both are logged.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, tick};
use log::{debug, error, info, warn};
use price_common::defaults::backfill_window;
use price_common::{Change24h, PriceSample, ReferencePolicy, TrackerError};

use crate::config::TrackerConfig;
use crate::fetcher::QuoteFetcher;
use crate::history_store::HistoryStore;
use crate::model::price_store::PriceStore;

/// Result of refreshing one symbol once.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The store was updated and the window persisted.
    Updated {
        /// Fetched price.
        price: f64,
        /// Change against the 24h reference.
        change: Change24h,
    },
    /// The store was updated but persisting the window failed.
    PersistFailed {
        /// Fetched price.
        price: f64,
    },
    /// The quote source failed; nothing was written.
    FetchFailed,
    /// The store refused the value (empty symbol or non-finite price).
    Rejected,
}

/// Tally of one sequential cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Symbols whose store entry was updated (persisted or not).
    pub updated: usize,
    /// Symbols whose fetch failed or whose value was rejected.
    pub failed: usize,
    /// Symbols updated in memory but not persisted.
    pub persist_failed: usize,
}

/// Drives periodic acquisition of quotes for a fixed symbol set.
pub struct RefreshScheduler {
    symbols: Vec<String>,
    interval: Duration,
    store: Arc<PriceStore>,
    fetcher: Arc<dyn QuoteFetcher>,
    persister: Arc<dyn HistoryStore>,
    policy: ReferencePolicy,
    backfill: bool,
    in_flight: HashMap<String, Arc<AtomicBool>>,
}

impl RefreshScheduler {
    /// Create a scheduler for `symbols`, refreshed every `interval`.
    ///
    /// Duplicate symbols are refreshed once. Backfill is on and the reference policy
    /// is [`ReferencePolicy::OldestInWindow`] unless overridden.
    pub fn new(
        symbols: &[String],
        interval: Duration,
        store: Arc<PriceStore>,
        fetcher: Arc<dyn QuoteFetcher>,
        persister: Arc<dyn HistoryStore>,
    ) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if !unique.contains(symbol) {
                unique.push(symbol.clone());
            }
        }
        let in_flight = unique
            .iter()
            .map(|s| (s.clone(), Arc::new(AtomicBool::new(false))))
            .collect();

        Self {
            symbols: unique,
            interval,
            store,
            fetcher,
            persister,
            policy: ReferencePolicy::default(),
            backfill: true,
            in_flight,
        }
    }

    /// Create a scheduler from the symbols, cadence, policy, and backfill flag of `config`.
    pub fn from_config(
        config: &TrackerConfig,
        store: Arc<PriceStore>,
        fetcher: Arc<dyn QuoteFetcher>,
        persister: Arc<dyn HistoryStore>,
    ) -> Self {
        Self::new(&config.symbols, config.interval, store, fetcher, persister)
            .with_policy(config.reference_policy)
            .with_backfill(config.backfill)
    }

    /// Set the 24h reference policy.
    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable or disable cold-start backfill.
    pub fn with_backfill(mut self, backfill: bool) -> Self {
        self.backfill = backfill;
        self
    }

    /// Symbols refreshed each cycle.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Refresh a single symbol: backfill if cold, fetch, update, persist.
    pub fn refresh_symbol(&self, symbol: &str) -> RefreshOutcome {
        if self.backfill && self.store.window_stats(symbol).len == 0 {
            self.backfill_symbol(symbol);
        }

        let price = match self.fetcher.fetch_price(symbol) {
            Ok(price) => price,
            Err(e) => {
                warn!("{}: fetch failed, keeping last value: {}", symbol, e);
                return RefreshOutcome::FetchFailed;
            }
        };

        let stats = self.store.window_stats(symbol);
        let change = self
            .policy
            .change(price, stats.oldest, stats.len, stats.capacity);

        if let Err(e) = self.store.update_price(
            symbol,
            price,
            change.percent_change,
            change.price_change,
        ) {
            error!("{}: update rejected: {}", symbol, e);
            return RefreshOutcome::Rejected;
        }
        debug!(
            "{}: {:.4} ({:+.4}, {:+.2}%)",
            symbol, price, change.price_change, change.percent_change
        );

        let samples = self.store.persistence_view(symbol);
        if let Err(e) = self.persister.save(symbol, &samples) {
            warn!("{}: could not persist history: {}", symbol, e);
            return RefreshOutcome::PersistFailed { price };
        }

        RefreshOutcome::Updated { price, change }
    }

    /// Refresh every symbol once, sequentially, on the calling thread.
    pub fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        for symbol in &self.symbols {
            match self.refresh_symbol(symbol) {
                RefreshOutcome::Updated { .. } => report.updated += 1,
                RefreshOutcome::PersistFailed { .. } => {
                    report.updated += 1;
                    report.persist_failed += 1;
                }
                RefreshOutcome::FetchFailed | RefreshOutcome::Rejected => report.failed += 1,
            }
        }
        debug!("Cycle finished: {:?}", report);
        report
    }

    /// Start the driver thread. The first cycle is dispatched immediately.
    pub fn start(self) -> std::io::Result<SchedulerHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let scheduler = Arc::new(self);

        info!(
            "Refresh scheduler started for {} symbol(s), every {:?}",
            scheduler.symbols.len(),
            scheduler.interval
        );
        let driver = thread::Builder::new()
            .name("refresh-driver".to_string())
            .spawn(move || scheduler.drive(stop_rx))?;

        Ok(SchedulerHandle {
            stop_tx: Some(stop_tx),
            driver: Some(driver),
        })
    }

    fn backfill_symbol(&self, symbol: &str) {
        match self.fetcher.fetch_history(symbol, backfill_window()) {
            Ok(samples) if samples.is_empty() => debug!("{}: backfill returned no data", symbol),
            Ok(samples) => {
                let count = samples.len();
                let points = samples.into_iter().map(PriceSample::into_point).collect();
                match self.store.set_history(symbol, points) {
                    Ok(()) => info!("{}: backfilled {} point(s)", symbol, count),
                    Err(e) => error!("{}: backfill rejected: {}", symbol, e),
                }
            }
            Err(TrackerError::Unsupported(_)) => debug!("{}: source has no history", symbol),
            Err(e) => warn!("{}: backfill failed: {}", symbol, e),
        }
    }

    fn drive(self: Arc<Self>, stop_rx: Receiver<()>) {
        let ticker = tick(self.interval);
        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        self.dispatch_cycle(&mut workers);

        loop {
            select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    reap_finished(&mut workers);
                    // select! picks at random when both channels are ready
                    if stop_requested(&stop_rx) {
                        break;
                    }
                    self.dispatch_cycle(&mut workers);
                }
            }
        }

        info!("Refresh scheduler stopping, waiting for {} worker(s)", workers.len());
        for worker in workers {
            if worker.join().is_err() {
                error!("Refresh worker panicked");
            }
        }
        info!("Refresh scheduler stopped");
    }

    fn dispatch_cycle(self: &Arc<Self>, workers: &mut Vec<JoinHandle<()>>) {
        for symbol in &self.symbols {
            let Some(flag) = self.in_flight.get(symbol) else {
                continue;
            };
            if flag
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                warn!("{}: previous refresh still in flight, skipping cycle", symbol);
                continue;
            }

            let guard = InFlightGuard(Arc::clone(flag));
            let scheduler = Arc::clone(self);
            let worker_symbol = symbol.clone();
            let spawned = thread::Builder::new()
                .name(format!("refresh-{symbol}"))
                .spawn(move || {
                    let _guard = guard;
                    scheduler.refresh_symbol(&worker_symbol);
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => error!("{}: could not spawn refresh worker: {}", symbol, e),
            }
        }
    }
}

/// Whether the stop channel has a message or has been disconnected.
fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

/// Clears a symbol's in-flight flag when its worker ends, even by panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn reap_finished(workers: &mut Vec<JoinHandle<()>>) {
    let (finished, running): (Vec<_>, Vec<_>) =
        workers.drain(..).partition(|handle| handle.is_finished());
    *workers = running;
    for handle in finished {
        if handle.join().is_err() {
            error!("Refresh worker panicked");
        }
    }
}

/// Owner of a running scheduler; stops it on `stop` or drop.
pub struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    driver: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Whether the driver thread is still running.
    pub fn is_running(&self) -> bool {
        self.driver
            .as_ref()
            .is_some_and(|driver| !driver.is_finished())
    }

    /// Signal shutdown and wait for the driver and its workers to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(driver) = self.driver.take() {
            if driver.join().is_err() {
                error!("Refresh driver panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Seed each symbol's window from durable storage.
///
/// Best-effort: load failures and rejected data are logged and skipped. Starting
/// and current prices are left alone. Returns how many symbols were seeded.
pub fn seed_from_store(store: &PriceStore, history: &dyn HistoryStore, symbols: &[String]) -> usize {
    let mut seeded = 0;
    for symbol in symbols {
        match history.load(symbol) {
            Ok(samples) if samples.is_empty() => {}
            Ok(samples) => {
                let count = samples.len();
                let points = samples.into_iter().map(PriceSample::into_point).collect();
                match store.set_history(symbol, points) {
                    Ok(()) => {
                        info!("{}: restored {} point(s) from storage", symbol, count);
                        seeded += 1;
                    }
                    Err(e) => warn!("{}: stored history rejected: {}", symbol, e),
                }
            }
            Err(e) => warn!("{}: could not load stored history: {}", symbol, e),
        }
    }
    seeded
}

//! Concurrent bounded price cache.
//!
//! `PriceStore` is the single source of truth for every tracked symbol's current
//! price, its once-only starting price, and a trailing window of observations. It is
//! shared (behind an `Arc`) between the refresh scheduler, which writes, and any
//! number of readers.
//!
//! Locking:
//! - A `RwLock` guards the symbol map. It is write-locked only when a symbol is seen
//!   for the first time; every other access takes the read side, so updates to
//!   different symbols do not contend.
//! - A `Mutex` per symbol guards that symbol's window, baseline, and latest point.
//!   One update is one critical section: a reader never sees a half-applied update.
//! - The current price is additionally published in an atomic, stored with release
//!   ordering after the window append inside the critical section. A lock-free reader
//!   that sees price *k* and then reads the history is guaranteed to find point *k*.
//!
//! No I/O happens under any of these locks. Read operations return owned copies.
//! Unknown symbols read as zero/empty; only invalid writes are errors.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use price_common::defaults::HISTORY_CAPACITY;
use price_common::{PricePoint, PriceSample, Result, TrackerError};

/// Per-symbol state, owned exclusively by the store.
struct SymbolState {
    /// Latest price as `f64` bits; readable without taking `inner`.
    current: AtomicU64,
    inner: Mutex<SymbolInner>,
}

struct SymbolInner {
    /// Set by the first `update_price`, never overwritten.
    starting_price: Option<f64>,
    /// Most recent point appended by `update_price`.
    latest: Option<PricePoint>,
    /// Oldest first, at most `capacity` points.
    history: VecDeque<PricePoint>,
}

impl SymbolState {
    fn new(capacity: usize) -> Self {
        Self {
            current: AtomicU64::new(0f64.to_bits()),
            inner: Mutex::new(SymbolInner {
                starting_price: None,
                latest: None,
                history: VecDeque::with_capacity(capacity),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SymbolInner> {
        // Critical sections cannot panic half-way, so a poisoned state is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_price(&self) -> f64 {
        f64::from_bits(self.current.load(Ordering::Acquire))
    }
}

/// Consistent view of one symbol, read under a single lock acquisition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolSnapshot {
    /// Latest price, `0.0` if never updated.
    pub current_price: f64,
    /// First price ever recorded, `0.0` if never updated.
    pub starting_price: f64,
    /// Most recent point appended by an update (zero-valued if none).
    pub latest: PricePoint,
    /// Window contents, oldest first.
    pub history: Vec<PricePoint>,
}

/// Shape of a symbol's window, used to pick the 24h reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Price of the oldest point in the window.
    pub oldest: Option<f64>,
    /// Number of points in the window.
    pub len: usize,
    /// Maximum number of points the window holds.
    pub capacity: usize,
}

impl WindowStats {
    /// Whether the window holds `capacity` points.
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }
}

/// Thread-safe store of current and historical prices keyed by symbol.
pub struct PriceStore {
    capacity: usize,
    symbols: RwLock<HashMap<String, Arc<SymbolState>>>,
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceStore {
    /// Create a store retaining [`HISTORY_CAPACITY`] points per symbol.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a store retaining `capacity` points per symbol (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            symbols: RwLock::new(HashMap::new()),
        }
    }

    /// Window capacity per symbol.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a fresh observation for `symbol`.
    ///
    /// Sets the starting price if this is the symbol's first update, publishes the
    /// new current price, and appends a point stamped now, evicting the oldest point
    /// once the window is full. Fails for an empty symbol or a non-finite price.
    pub fn update_price(
        &self,
        symbol: &str,
        price: f64,
        percent_change_24h: f64,
        price_change_24h: f64,
    ) -> Result<()> {
        validate_symbol(symbol)?;
        if !price.is_finite() {
            return Err(TrackerError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }

        let state = self.entry(symbol);
        let mut inner = state.lock();
        let point = PricePoint::now(price, percent_change_24h, price_change_24h);

        inner.starting_price.get_or_insert(price);
        if inner.history.len() >= self.capacity {
            inner.history.pop_front();
        }
        inner.history.push_back(point);
        inner.latest = Some(point);
        state.current.store(price.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Latest price for `symbol`, or `0.0` if it was never updated.
    pub fn current_price(&self, symbol: &str) -> f64 {
        self.get(symbol)
            .map(|state| state.current_price())
            .unwrap_or(0.0)
    }

    /// Most recent point appended by [`Self::update_price`], or a zero-valued point.
    pub fn price_snapshot(&self, symbol: &str) -> PricePoint {
        self.get(symbol)
            .and_then(|state| {
                let inner = state.lock();
                inner.latest
            })
            .unwrap_or_default()
    }

    /// The first price ever recorded for `symbol`, or `0.0`.
    pub fn starting_price(&self, symbol: &str) -> f64 {
        self.get(symbol)
            .and_then(|state| {
                let inner = state.lock();
                inner.starting_price
            })
            .unwrap_or(0.0)
    }

    /// Copy of the window for `symbol`, oldest first; empty if unknown.
    pub fn history(&self, symbol: &str) -> Vec<PricePoint> {
        self.get(symbol)
            .map(|state| {
                let inner = state.lock();
                inner.history.iter().copied().collect()
            })
            .unwrap_or_default()
    }

    /// Replace the window for `symbol` wholesale.
    ///
    /// Used to seed from persisted or backfilled data. Does not touch the starting
    /// or current price. Only the newest `capacity` points are kept.
    pub fn set_history(&self, symbol: &str, points: Vec<PricePoint>) -> Result<()> {
        validate_symbol(symbol)?;
        let skip = points.len().saturating_sub(self.capacity);
        let history: VecDeque<PricePoint> = points.into_iter().skip(skip).collect();

        let state = self.entry(symbol);
        state.lock().history = history;
        Ok(())
    }

    /// `(timestamp, price)` projection of the window, for persistence.
    pub fn persistence_view(&self, symbol: &str) -> Vec<PriceSample> {
        self.get(symbol)
            .map(|state| {
                let inner = state.lock();
                inner.history.iter().map(PricePoint::sample).collect()
            })
            .unwrap_or_default()
    }

    /// Current price, baseline, latest point, and window of `symbol`, all from one
    /// critical section.
    pub fn snapshot(&self, symbol: &str) -> SymbolSnapshot {
        let Some(state) = self.get(symbol) else {
            return SymbolSnapshot::default();
        };
        let inner = state.lock();
        SymbolSnapshot {
            current_price: state.current_price(),
            starting_price: inner.starting_price.unwrap_or(0.0),
            latest: inner.latest.unwrap_or_default(),
            history: inner.history.iter().copied().collect(),
        }
    }

    /// Oldest price, length, and capacity of the window for `symbol`.
    pub fn window_stats(&self, symbol: &str) -> WindowStats {
        let (oldest, len) = self
            .get(symbol)
            .map(|state| {
                let inner = state.lock();
                (inner.history.front().map(|p| p.price), inner.history.len())
            })
            .unwrap_or((None, 0));
        WindowStats {
            oldest,
            len,
            capacity: self.capacity,
        }
    }

    /// Symbols that have state, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.read_map().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of symbols that have state.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    /// Whether no symbol has state yet.
    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<SymbolState>>> {
        self.symbols.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, symbol: &str) -> Option<Arc<SymbolState>> {
        self.read_map().get(symbol).cloned()
    }

    fn entry(&self, symbol: &str) -> Arc<SymbolState> {
        if let Some(state) = self.get(symbol) {
            return state;
        }
        let mut map = self.symbols.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            map.entry(symbol.to_string())
                .or_insert_with(|| Arc::new(SymbolState::new(self.capacity))),
        )
    }
}

fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(TrackerError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use common::{BrokenHistoryStore, ScriptedFetcher, SlowFetcher, symbols};
use price_common::{Change24h, ReferencePolicy};
use price_tracker::HistoryStore;
use price_tracker::history_store::MemoryHistoryStore;
use price_tracker::model::PriceStore;
use price_tracker::scheduler::{CycleReport, RefreshOutcome, RefreshScheduler, seed_from_store};

const MINUTE: Duration = Duration::from_secs(60);

fn scheduler(
    fetcher: ScriptedFetcher,
    list: &[&str],
) -> (RefreshScheduler, Arc<PriceStore>, Arc<MemoryHistoryStore>) {
    let store = Arc::new(PriceStore::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let scheduler = RefreshScheduler::new(
        &symbols(list),
        MINUTE,
        Arc::clone(&store),
        Arc::new(fetcher),
        history.clone(),
    );
    (scheduler, store, history)
}

#[test]
fn cold_start_change_is_neutral() {
    let fetcher = ScriptedFetcher::new().with_prices("BTC", &[50_000.0]);
    let (scheduler, store, _) = scheduler(fetcher, &["BTC"]);

    let outcome = scheduler.refresh_symbol("BTC");
    assert_eq!(
        outcome,
        RefreshOutcome::Updated {
            price: 50_000.0,
            change: Change24h::neutral()
        }
    );
    assert_eq!(store.starting_price("BTC"), 50_000.0);
    assert_eq!(store.price_snapshot("BTC").percent_change_24h, 0.0);
}

#[test]
fn change_is_measured_against_oldest_point() {
    let fetcher = ScriptedFetcher::new().with_prices("BTC", &[50_000.0, 50_500.0, 51_000.0]);
    let (scheduler, store, _) = scheduler(fetcher, &["BTC"]);

    for _ in 0..3 {
        scheduler.refresh_symbol("BTC");
    }
    let latest = store.price_snapshot("BTC");
    assert_eq!(latest.price, 51_000.0);
    assert_eq!(latest.price_change_24h, 1_000.0);
    assert!((latest.percent_change_24h - 2.0).abs() < 1e-9);
}

#[test]
fn full_window_policy_stays_neutral_until_window_fills() {
    let fetcher = ScriptedFetcher::new().with_prices("BTC", &[100.0, 110.0, 120.0, 130.0]);
    let store = Arc::new(PriceStore::with_capacity(2));
    let scheduler = RefreshScheduler::new(
        &symbols(&["BTC"]),
        MINUTE,
        Arc::clone(&store),
        Arc::new(fetcher),
        Arc::new(MemoryHistoryStore::new()),
    )
    .with_policy(ReferencePolicy::FullWindowOnly);

    scheduler.refresh_symbol("BTC");
    scheduler.refresh_symbol("BTC");
    assert_eq!(store.price_snapshot("BTC").price_change_24h, 0.0);

    // Window [100, 110] is full: reference is 100.
    scheduler.refresh_symbol("BTC");
    assert_eq!(store.price_snapshot("BTC").price_change_24h, 20.0);

    // Window [110, 120] is full: reference is 110.
    scheduler.refresh_symbol("BTC");
    assert_eq!(store.price_snapshot("BTC").price_change_24h, 20.0);
}

#[test]
fn fetch_failure_skips_symbol_and_keeps_last_value() {
    let fetcher = ScriptedFetcher::new()
        .with_prices("BTC", &[50_000.0])
        .with_prices("ETH", &[3_000.0, 3_100.0]);
    let (scheduler, store, history) = scheduler(fetcher, &["BTC", "ETH", "SOL"]);

    let first = scheduler.run_cycle();
    assert_eq!(
        first,
        CycleReport {
            updated: 2,
            failed: 1,
            persist_failed: 0
        }
    );

    let second = scheduler.run_cycle();
    assert_eq!(second.updated, 1);
    assert_eq!(second.failed, 2);

    assert_eq!(store.current_price("BTC"), 50_000.0);
    assert_eq!(store.history("BTC").len(), 1);
    assert_eq!(store.current_price("ETH"), 3_100.0);
    assert!(store.history("SOL").is_empty());
    assert!(history.load("SOL").unwrap().is_empty());
}

#[test]
fn each_update_persists_the_whole_window() {
    let fetcher = ScriptedFetcher::new().with_prices("ETH", &[1.0, 2.0, 3.0]);
    let (scheduler, store, history) = scheduler(fetcher, &["ETH"]);

    for _ in 0..3 {
        scheduler.run_cycle();
    }
    let saved = history.load("ETH").unwrap();
    assert_eq!(saved, store.persistence_view("ETH"));
    let prices: Vec<f64> = saved.iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![1.0, 2.0, 3.0]);
}

#[test]
fn persistence_failure_is_absorbed() {
    let store = Arc::new(PriceStore::new());
    let scheduler = RefreshScheduler::new(
        &symbols(&["BTC"]),
        MINUTE,
        Arc::clone(&store),
        Arc::new(ScriptedFetcher::new().with_prices("BTC", &[10.0, 11.0])),
        Arc::new(BrokenHistoryStore),
    );

    assert_eq!(
        scheduler.refresh_symbol("BTC"),
        RefreshOutcome::PersistFailed { price: 10.0 }
    );
    let report = scheduler.run_cycle();
    assert_eq!(report.updated, 1);
    assert_eq!(report.persist_failed, 1);
    assert_eq!(store.current_price("BTC"), 11.0);
    assert_eq!(store.history("BTC").len(), 2);
}

#[test]
fn non_finite_quote_is_rejected() {
    let fetcher = ScriptedFetcher::new().with_prices("BTC", &[f64::INFINITY]);
    let (scheduler, store, _) = scheduler(fetcher, &["BTC"]);
    assert_eq!(scheduler.refresh_symbol("BTC"), RefreshOutcome::Rejected);
    assert_eq!(store.current_price("BTC"), 0.0);
}

#[test]
fn cold_symbol_is_backfilled_before_first_live_point() {
    let fetcher = ScriptedFetcher::new()
        .with_prices("BTC", &[120.0])
        .with_history("BTC", &[100.0, 105.0, 110.0]);
    let (scheduler, store, _) = scheduler(fetcher, &["BTC"]);

    scheduler.refresh_symbol("BTC");
    let prices: Vec<f64> = store.history("BTC").iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![100.0, 105.0, 110.0, 120.0]);

    let latest = store.price_snapshot("BTC");
    assert_eq!(latest.price_change_24h, 20.0);
    assert!((latest.percent_change_24h - 20.0).abs() < 1e-9);
    assert_eq!(store.starting_price("BTC"), 120.0);
}

#[test]
fn backfill_runs_only_while_window_is_empty() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_prices("BTC", &[1.0, 2.0])
            .with_history("BTC", &[0.5]),
    );
    let scheduler = RefreshScheduler::new(
        &symbols(&["BTC"]),
        MINUTE,
        Arc::new(PriceStore::new()),
        fetcher.clone(),
        Arc::new(MemoryHistoryStore::new()),
    );
    scheduler.run_cycle();
    scheduler.run_cycle();
    assert_eq!(fetcher.history_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_or_disabled_backfill_still_fetches_live_price() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .with_prices("BTC", &[10.0])
            .with_failing_history(),
    );
    let store = Arc::new(PriceStore::new());
    let scheduler = RefreshScheduler::new(
        &symbols(&["BTC"]),
        MINUTE,
        Arc::clone(&store),
        fetcher.clone(),
        Arc::new(MemoryHistoryStore::new()),
    );
    assert!(matches!(
        scheduler.refresh_symbol("BTC"),
        RefreshOutcome::Updated { .. }
    ));
    assert_eq!(store.history("BTC").len(), 1);

    let fetcher = Arc::new(ScriptedFetcher::new().with_prices("ETH", &[10.0]));
    let scheduler = RefreshScheduler::new(
        &symbols(&["ETH"]),
        MINUTE,
        Arc::new(PriceStore::new()),
        fetcher.clone(),
        Arc::new(MemoryHistoryStore::new()),
    )
    .with_backfill(false);
    scheduler.run_cycle();
    assert_eq!(fetcher.history_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn history_is_not_supported_by_default() {
    let fetcher = SlowFetcher::new(Duration::ZERO);
    let store = Arc::new(PriceStore::new());
    let scheduler = RefreshScheduler::new(
        &symbols(&["BTC"]),
        MINUTE,
        Arc::clone(&store),
        Arc::new(fetcher),
        Arc::new(MemoryHistoryStore::new()),
    );
    assert!(matches!(
        scheduler.refresh_symbol("BTC"),
        RefreshOutcome::Updated { price, .. } if price == 42.0
    ));
}

#[test]
fn duplicate_symbols_are_refreshed_once() {
    let fetcher = ScriptedFetcher::new().with_prices("BTC", &[1.0, 2.0]);
    let (scheduler, store, _) = scheduler(fetcher, &["BTC", "BTC"]);
    assert_eq!(scheduler.symbols(), &["BTC".to_string()]);
    assert_eq!(scheduler.run_cycle().updated, 1);
    assert_eq!(store.history("BTC").len(), 1);
}

#[test]
fn seeding_restores_windows_without_baselines() {
    let saved = Arc::new(MemoryHistoryStore::new());
    let source = PriceStore::new();
    source.update_price("BTC", 1.0, 0.0, 0.0).unwrap();
    source.update_price("BTC", 2.0, 0.0, 0.0).unwrap();
    saved.save("BTC", &source.persistence_view("BTC")).unwrap();

    let store = PriceStore::new();
    let seeded = seed_from_store(&store, &*saved, &symbols(&["BTC", "ETH"]));
    assert_eq!(seeded, 1);
    assert_eq!(store.history("BTC").len(), 2);
    assert_eq!(store.starting_price("BTC"), 0.0);
    assert_eq!(store.current_price("BTC"), 0.0);
    assert!(store.history("ETH").is_empty());

    let nothing = seed_from_store(&store, &BrokenHistoryStore, &symbols(&["SOL"]));
    assert_eq!(nothing, 0);
}

#[test]
fn started_scheduler_refreshes_until_stopped() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
    let store = Arc::new(PriceStore::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let handle = RefreshScheduler::new(
        &symbols(&["BTC", "ETH"]),
        Duration::from_millis(20),
        Arc::clone(&store),
        fetcher.clone(),
        history.clone(),
    )
    .start()
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while store.history("ETH").len() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(handle.is_running());
    handle.stop();

    assert!(store.history("BTC").len() >= 1);
    assert!(store.history("ETH").len() >= 3);
    assert_eq!(history.len(), 2);

    let calls = fetcher.calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls);
}

#[test]
fn slow_fetches_never_overlap_per_symbol() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::from_millis(100)));
    let handle = RefreshScheduler::new(
        &symbols(&["BTC"]),
        Duration::from_millis(10),
        Arc::new(PriceStore::new()),
        fetcher.clone(),
        Arc::new(MemoryHistoryStore::new()),
    )
    .start()
    .unwrap();

    thread::sleep(Duration::from_millis(450));
    handle.stop();

    assert_eq!(fetcher.max_active.load(Ordering::SeqCst), 1);
    let calls = fetcher.calls.load(Ordering::SeqCst);
    assert!((2..=6).contains(&calls), "unexpected call count {calls}");
}

#[test]
fn dropping_the_handle_stops_the_scheduler() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
    {
        let _handle = RefreshScheduler::new(
            &symbols(&["BTC"]),
            Duration::from_millis(10),
            Arc::new(PriceStore::new()),
            fetcher.clone(),
            Arc::new(MemoryHistoryStore::new()),
        )
        .start()
        .unwrap();
        thread::sleep(Duration::from_millis(50));
    }
    let calls = fetcher.calls.load(Ordering::SeqCst);
    assert!(calls >= 1);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls);
}

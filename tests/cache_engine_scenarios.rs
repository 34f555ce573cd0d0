//! End-to-end scenarios for the cache engine.
//!
//! Each test drives the engine through a manual data source so that the
//! order of completions is fully controlled.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use common::{manual_engine, rows, HoldFirstDataSource};
use rowcache::{
    CacheEngine, CacheOptions, Completion, ModelUpdated, PageNumber, PageState, RowData, RowId,
    RowStatus,
};

#[test]
fn test_first_page_load_extends_row_count() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(100).overflow_size(1));

    engine.get_row(0);
    assert_eq!(engine.page_states()[&PageNumber::new(0)], PageState::Loading);

    assert_eq!(source.succeed(0, 100), Completion::Applied);
    assert_eq!(engine.page_states()[&PageNumber::new(0)], PageState::Loaded);
    assert!(engine.row_count() >= 101);

    let row = engine.get_row(99);
    assert!(row.is_loaded());
    assert_eq!(row.id(), &RowId::Assigned("id-99".into()));
}

#[test]
fn test_request_ceiling_defers_third_page() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(100).max_concurrent_requests(2));

    engine.get_row(0);
    engine.get_row(250);
    engine.get_row(500);

    assert_eq!(source.pending_starts(), vec![0, 200]);
    assert_eq!(engine.active_requests(), 2);

    // Accessing the deferred page again still cannot exceed the ceiling
    engine.get_row(510);
    assert_eq!(source.in_flight(), 2);

    source.succeed(0, 100);
    assert_eq!(source.pending_starts(), vec![200, 500]);
    assert_eq!(engine.active_requests(), 2);
}

#[test]
fn test_deferred_pages_resume_most_recent_first() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10).max_concurrent_requests(1));

    engine.get_row(0);
    engine.get_row(10);
    engine.get_row(20);
    engine.get_row(30);
    engine.get_row(15); // page 1 is now the most recent
    assert_eq!(source.pending_starts(), vec![0]);

    source.succeed(0, 10);
    assert_eq!(source.pending_starts(), vec![10]);
    source.succeed(10, 10);
    assert_eq!(source.pending_starts(), vec![30]);
    source.succeed(30, 10);
    assert_eq!(source.pending_starts(), vec![20]);
}

#[test]
fn test_deferred_pages_past_final_count_are_dropped() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10).max_concurrent_requests(1));

    engine.get_row(0);
    engine.get_row(50);
    engine.get_row(90);
    assert_eq!(engine.page_count(), 3);

    source.succeed(0, 4);

    assert_eq!(engine.row_count(), 4);
    let pages: Vec<PageNumber> = engine.page_states().into_keys().collect();
    assert_eq!(pages, vec![PageNumber::new(0)]);
    assert_eq!(source.issued().len(), 1);
    assert_eq!(engine.active_requests(), 0);
}

#[test]
fn test_synchronous_completions_drain_deferred_pages_iteratively() {
    let source = Arc::new(HoldFirstDataSource::default());
    let engine = CacheEngine::new(
        CacheOptions::new().page_size(10).max_concurrent_requests(1).build(),
        source.clone(),
    );

    const PAGES: usize = 3_000;
    for page in 0..PAGES {
        engine.get_row(page * 10);
    }
    assert_eq!(source.requests(), 1);

    assert_eq!(source.release(), Some(Completion::Applied));

    assert_eq!(source.requests(), PAGES);
    assert_eq!(engine.active_requests(), 0);
    assert!(engine.page_states().values().all(|state| *state == PageState::Loaded));
    assert!(engine.get_row(PAGES * 10 - 1).is_loaded());
}

#[test]
fn test_last_addressable_row_is_fetchable() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(100));

    let row = engine.get_row(usize::MAX);
    assert_eq!(row.status(), &RowStatus::Pending);

    let request = source.issued()[0].clone();
    let start = usize::MAX - usize::MAX % 100;
    assert_eq!(request.start_row, start);
    assert_eq!(request.end_row, usize::MAX);

    let callback = source.take_callback(start);
    assert_eq!(callback.success(vec![RowData::default()], None), Completion::Applied);
    assert_eq!(engine.row_count(), start + 1);
    assert!(engine.get_row(start).is_loaded());

    let (engine, source) = manual_engine(CacheOptions::new().page_size(1));
    engine.get_row(usize::MAX);
    assert_eq!(source.issued()[0].rows(), usize::MAX..=usize::MAX);

    let callback = source.take_callback(usize::MAX);
    assert_eq!(callback.success(vec![RowData::default()], None), Completion::Applied);
    assert_eq!(engine.row_count(), usize::MAX);
    assert!(engine.get_row(usize::MAX).is_loaded());
}

#[test]
fn test_short_page_fixes_count_and_stops_fetching() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(100));

    engine.get_row(300);
    source.succeed(300, 40);

    assert_eq!(engine.row_count(), 340);
    assert!(engine.is_row_count_final());

    assert_eq!(engine.get_row(345).status(), &RowStatus::OutOfRange);
    assert_eq!(engine.get_row(5_000).status(), &RowStatus::OutOfRange);
    assert_eq!(source.in_flight(), 0);
    assert_eq!(source.issued().len(), 1);

    // Later full pages never grow a final count
    engine.get_row(0);
    source.succeed(0, 100);
    assert_eq!(engine.row_count(), 340);
}

#[test]
fn test_eviction_and_refetch() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(100).max_pages_in_cache(2));

    for start in [0, 100, 200] {
        engine.get_row(start);
        source.succeed(start, 100);
    }

    let states = engine.page_states();
    assert!(!states.contains_key(&PageNumber::new(0)));
    assert_eq!(states.get(&PageNumber::new(1)), Some(&PageState::Loaded));
    assert_eq!(states.get(&PageNumber::new(2)), Some(&PageState::Loaded));

    assert!(engine.get_row(0).is_placeholder());
    assert_eq!(source.pending_starts(), vec![0]);
    assert_eq!(source.issued().len(), 4);
}

#[test]
fn test_out_of_order_completions() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10).max_concurrent_requests(3));

    engine.get_row(0);
    engine.get_row(10);
    engine.get_row(20);

    // Reverse order
    source.succeed(20, 10);
    source.succeed(10, 10);
    source.succeed(0, 10);

    assert_eq!(engine.loaded_page_count(), 3);
    assert_eq!(engine.row_count(), 31);
    for i in 0..30 {
        assert_eq!(engine.get_row(i).field("n"), Some(&serde_json::json!(i)));
    }
}

#[test]
fn test_failed_page_stays_failed() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10));

    engine.get_row(0);
    engine.get_row(10);
    source.fail(0);
    source.succeed(10, 10);

    // Other pages unaffected; the failed one is never retried
    assert!(engine.get_row(15).is_loaded());
    for _ in 0..3 {
        assert!(matches!(engine.get_row(3).status(), RowStatus::Failed(_)));
    }
    assert_eq!(source.issued().len(), 2);
}

#[test]
fn test_destroy_with_requests_in_flight() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10));
    let events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&events);
    let _sub = engine.listeners().subscribe(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    engine.get_row(0);
    engine.get_row(10);
    engine.destroy();

    assert_eq!(source.succeed(0, 10), Completion::Stale);
    assert_eq!(source.fail(10), Completion::Stale);
    assert_eq!(events.load(Ordering::Relaxed), 0);
    assert_eq!(engine.page_count(), 0);
    assert_eq!(engine.active_requests(), 0);
}

#[test]
fn test_completion_from_another_thread() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10));
    let events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&events);
    let _sub = engine.listeners().subscribe(move |event| {
        if matches!(event, ModelUpdated::PageLoaded(_)) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    engine.get_row(0);
    let callback = source.take_callback(0);
    let handle = thread::spawn(move || callback.success(rows(0, 10), None));

    assert_eq!(handle.join().unwrap(), Completion::Applied);
    assert_eq!(events.load(Ordering::Relaxed), 1);
    assert!(engine.get_row(5).is_loaded());
}

#[test]
fn test_listener_can_read_rows() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10));
    let engine = Arc::new(engine);

    let loaded = Arc::new(AtomicUsize::new(0));
    let reader = Arc::downgrade(&engine);
    let counter = Arc::clone(&loaded);
    let _sub = engine.listeners().subscribe(move |_| {
        if let Some(engine) = reader.upgrade() {
            if engine.is_row_loaded(0) {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    engine.get_row(0);
    source.succeed(0, 10);
    assert_eq!(loaded.load(Ordering::Relaxed), 1);
}

#[test]
fn test_stats_track_hits_and_misses() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10));

    engine.get_row(0); // miss
    source.succeed(0, 10);
    engine.get_row(1); // hit
    engine.get_row(2); // hit

    let stats = engine.stats().snapshot();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.pages_loaded, 1);
}

#[test]
fn test_out_of_range_lookups_count_as_misses() {
    let (engine, source) = manual_engine(CacheOptions::new().page_size(10));

    engine.get_row(0);
    source.succeed(0, 4); // short page, count is final at 4
    engine.get_row(2); // hit
    engine.get_row(9); // out of range
    engine.get_row(500); // out of range

    let stats = engine.stats().snapshot();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.fetches, 1);
}

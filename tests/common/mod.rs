//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rowcache::{
    CacheEngine, CacheOptions, Completion, DataSource, FetchError, LoadCallback, RowData,
    RowFields, RowRequest,
};

/// A data source that holds every request until the test completes it.
#[derive(Default)]
pub struct ManualDataSource {
    pending: Mutex<Vec<(RowRequest, LoadCallback)>>,
    issued: Mutex<Vec<RowRequest>>,
}

impl DataSource for ManualDataSource {
    fn request_rows(&self, request: RowRequest, callback: LoadCallback) {
        self.issued.lock().push(request.clone());
        self.pending.lock().push((request, callback));
    }
}

impl ManualDataSource {
    /// Start rows of requests not yet completed, in issue order.
    pub fn pending_starts(&self) -> Vec<usize> {
        self.pending.lock().iter().map(|(r, _)| r.start_row).collect()
    }

    /// Every request ever issued.
    pub fn issued(&self) -> Vec<RowRequest> {
        self.issued.lock().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    fn take(&self, start_row: usize) -> LoadCallback {
        let mut pending = self.pending.lock();
        let pos = pending
            .iter()
            .position(|(r, _)| r.start_row == start_row)
            .unwrap_or_else(|| panic!("no pending request for row {start_row}"));
        pending.remove(pos).1
    }

    /// Complete the request starting at `start_row` with `count` rows.
    pub fn succeed(&self, start_row: usize, count: usize) -> Completion {
        let callback = self.take(start_row);
        callback.success(rows(start_row, count), None)
    }

    pub fn fail(&self, start_row: usize) -> Completion {
        let callback = self.take(start_row);
        callback.failure(FetchError::new("boom"))
    }

    /// Hand out the raw callback for tests that complete it elsewhere.
    pub fn take_callback(&self, start_row: usize) -> LoadCallback {
        self.take(start_row)
    }
}

/// Holds the first request; answers every later one from inside `request_rows`.
#[derive(Default)]
pub struct HoldFirstDataSource {
    held: Mutex<Option<(RowRequest, LoadCallback)>>,
    requests: AtomicUsize,
}

impl DataSource for HoldFirstDataSource {
    fn request_rows(&self, request: RowRequest, callback: LoadCallback) {
        if self.requests.fetch_add(1, Ordering::SeqCst) == 0 {
            *self.held.lock() = Some((request, callback));
            return;
        }
        let _ = callback.success(full_page(&request), None);
    }
}

impl HoldFirstDataSource {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Complete the held request with a full page.
    pub fn release(&self) -> Option<Completion> {
        let (request, callback) = self.held.lock().take()?;
        Some(callback.success(full_page(&request), None))
    }
}

fn full_page(request: &RowRequest) -> Vec<RowData> {
    request.rows().map(|_| RowData::default()).collect()
}

/// `count` rows whose `n` field is their absolute index.
pub fn rows(start_row: usize, count: usize) -> Vec<RowData> {
    (start_row..start_row + count)
        .map(|i| {
            RowData::with_id(
                format!("id-{i}"),
                RowFields::from([("n".to_string(), serde_json::json!(i))]),
            )
        })
        .collect()
}

pub fn manual_engine(options: CacheOptions) -> (CacheEngine, Arc<ManualDataSource>) {
    let source = Arc::new(ManualDataSource::default());
    let engine = CacheEngine::new(options.build(), source.clone());
    (engine, source)
}

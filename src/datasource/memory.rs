//! A data source over rows already in memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::datasource::{DataSource, LoadCallback, RowRequest};
use crate::row::RowData;

/// Serves rows from a shared `Vec`, completing every request synchronously.
///
/// Sort and filter descriptors are ignored. Useful for demos, benchmarks and
/// as the simplest possible example of the port.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use rowcache::{CacheEngine, CacheOptions, InMemoryDataSource, RowData};
///
/// let rows = (0..250).map(|_| RowData::default()).collect();
/// let source = Arc::new(InMemoryDataSource::new(rows));
/// let engine = CacheEngine::new(CacheOptions::new().build(), source);
///
/// assert!(engine.get_row(0).is_loaded());
/// assert_eq!(engine.row_count(), 101);
/// ```
#[derive(Debug)]
pub struct InMemoryDataSource {
    rows: Arc<Vec<RowData>>,
    report_last_row: bool,
    requests: AtomicU64,
}

impl InMemoryDataSource {
    pub fn new(rows: Vec<RowData>) -> Self {
        Self::from_arc(Arc::new(rows))
    }

    pub fn from_arc(rows: Arc<Vec<RowData>>) -> Self {
        Self {
            rows,
            report_last_row: false,
            requests: AtomicU64::new(0),
        }
    }

    /// Report the total row count with every response.
    pub fn with_last_row(mut self) -> Self {
        self.report_last_row = true;
        self
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl DataSource for InMemoryDataSource {
    fn request_rows(&self, request: RowRequest, callback: LoadCallback) {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let start = request.start_row.min(self.rows.len());
        let end = (request.end_row + 1).min(self.rows.len());
        let rows = self.rows[start..end].to_vec();
        let last_row = self.report_last_row.then_some(self.rows.len());

        let _ = callback.success(rows, last_row);
    }
}

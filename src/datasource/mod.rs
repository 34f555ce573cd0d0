//! The data source port.
//!
//! The cache never fetches rows itself. It hands a [`RowRequest`] and a
//! [`LoadCallback`] to a [`DataSource`] and carries on; the data source
//! completes the callback later, from any thread, exactly once.
//!
//! # Components
//! - [`DataSource`] - The capability the cache depends on
//! - [`RowRequest`] - Row range plus opaque sort/filter descriptors
//! - [`LoadCallback`] - Move-only completion handle
//! - [`InMemoryDataSource`] - Reference implementation over a `Vec`

pub(crate) mod callback;
mod memory;

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub use callback::{Completion, LoadCallback};
pub use memory::InMemoryDataSource;

/// Asynchronous row-fetching capability.
///
/// `request_rows` must return promptly; the result is delivered through the
/// callback, possibly before `request_rows` returns. Requests for different
/// pages may complete in any order.
pub trait DataSource: Send + Sync {
    fn request_rows(&self, request: RowRequest, callback: LoadCallback);
}

impl<F> DataSource for F
where
    F: Fn(RowRequest, LoadCallback) + Send + Sync,
{
    fn request_rows(&self, request: RowRequest, callback: LoadCallback) {
        self(request, callback)
    }
}

/// Opaque sort descriptor, forwarded to the data source unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortModel(pub serde_json::Value);

/// Opaque filter descriptor, forwarded to the data source unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterModel(pub serde_json::Value);

impl SortModel {
    pub fn new(value: serde_json::Value) -> Self {
        SortModel(value)
    }

    /// True when no sort is applied.
    pub fn is_empty(&self) -> bool {
        is_empty_value(&self.0)
    }
}

impl FilterModel {
    pub fn new(value: serde_json::Value) -> Self {
        FilterModel(value)
    }

    /// True when no filter is applied.
    pub fn is_empty(&self) -> bool {
        is_empty_value(&self.0)
    }
}

fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// One page worth of rows requested from a data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRequest {
    /// First requested row.
    pub start_row: usize,
    /// Last requested row, inclusive.
    pub end_row: usize,
    pub sort_model: SortModel,
    pub filter_model: FilterModel,
}

// A request always covers at least one row.
#[allow(clippy::len_without_is_empty)]
impl RowRequest {
    /// Number of rows requested.
    #[inline]
    pub fn len(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    #[inline]
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start_row..=self.end_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_bounds() {
        let request = RowRequest {
            start_row: 200,
            end_row: 299,
            sort_model: SortModel::default(),
            filter_model: FilterModel::default(),
        };
        assert_eq!(request.len(), 100);
        assert_eq!(request.rows(), 200..=299);
    }

    #[test]
    fn test_descriptor_emptiness() {
        assert!(SortModel::default().is_empty());
        assert!(SortModel::new(json!([])).is_empty());
        assert!(!SortModel::new(json!([{ "col": "a" }])).is_empty());
        assert!(FilterModel::new(json!({})).is_empty());
        assert!(!FilterModel::new(json!({ "age": { "gt": 3 } })).is_empty());
    }

    #[test]
    fn test_descriptors_are_transparent() {
        let sort = SortModel::new(json!([{ "col": "a", "dir": "desc" }]));
        let text = serde_json::to_string(&sort).unwrap();
        assert_eq!(text, r#"[{"col":"a","dir":"desc"}]"#);
    }
}

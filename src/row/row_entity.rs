//! RowEntity - one slot of the virtual row space.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Column key to value mapping of a row.
pub type RowFields = BTreeMap<String, serde_json::Value>;

/// Application supplied row identity, used when the data source assigns none.
pub type RowIdFn = Arc<dyn Fn(&RowData) -> Option<String> + Send + Sync>;

/// One row as returned by a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    /// Identity assigned by the data source, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub fields: RowFields,
}

impl RowData {
    pub fn new(fields: RowFields) -> Self {
        Self { id: None, fields }
    }

    pub fn with_id(id: impl Into<String>, fields: RowFields) -> Self {
        Self {
            id: Some(id.into()),
            fields,
        }
    }
}

/// Stable identity of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    /// Supplied by the data source or the application's identity function.
    Assigned(String),
    /// Derived from the absolute row index.
    Index(usize),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Assigned(id) => write!(f, "{}", id),
            RowId::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// Load state of a row as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    /// Data is present.
    Loaded,
    /// The owning page has not finished loading.
    Pending,
    /// The owning page failed; carries the data source's message.
    Failed(String),
    /// The index lies past the known end of the data.
    OutOfRange,
}

/// A row of the virtual row space, or a placeholder standing in for one.
///
/// Cloning is cheap: the field map is shared.
///
/// # Example
/// ```
/// use rowcache::{RowEntity, RowStatus};
///
/// let row = RowEntity::placeholder(42, 25.0, RowStatus::Pending);
/// assert!(row.is_placeholder());
/// assert!(row.fields().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RowEntity {
    id: RowId,
    index: usize,
    height: f64,
    fields: Arc<RowFields>,
    status: RowStatus,
}

impl RowEntity {
    /// A loaded row at `index`.
    ///
    /// The id comes from the data source, then `id_fn`, then the index.
    pub fn loaded(index: usize, data: RowData, height: f64, id_fn: Option<&RowIdFn>) -> Self {
        let id = data
            .id
            .clone()
            .or_else(|| id_fn.and_then(|f| f(&data)))
            .map(RowId::Assigned)
            .unwrap_or(RowId::Index(index));

        Self {
            id,
            index,
            height,
            fields: Arc::new(data.fields),
            status: RowStatus::Loaded,
        }
    }

    /// An empty stand-in for a row that is not available.
    pub fn placeholder(index: usize, height: f64, status: RowStatus) -> Self {
        Self {
            id: RowId::Index(index),
            index,
            height,
            fields: Arc::default(),
            status,
        }
    }

    #[inline]
    pub fn id(&self) -> &RowId {
        &self.id
    }

    /// Absolute index in the virtual row space.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn fields(&self) -> &RowFields {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    #[inline]
    pub fn status(&self) -> &RowStatus {
        &self.status
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.status == RowStatus::Loaded
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        !self.is_loaded()
    }
}

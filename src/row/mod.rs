//! Row values handed out by the cache.
//!
//! - [`RowData`] - One row as delivered by a data source
//! - [`RowEntity`] - A row (or placeholder) as seen by the presentation layer
//! - [`RowId`] / [`RowStatus`] - Identity and load state of a row

mod row_entity;

pub use row_entity::{RowData, RowEntity, RowFields, RowId, RowIdFn, RowStatus};

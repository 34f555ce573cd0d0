//! Orchestration over the cache engine.
//!
//! - [`RowModel`] - Owns the current engine and replaces it on every
//!   data source, sort, or filter change

mod row_model;

pub use row_model::RowModel;

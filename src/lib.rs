//! rowcache - a page-based row cache for virtualized tables.
//!
//! Interactive grids that scroll through millions of rows cannot hold them
//! all. This crate fetches bounded pages of rows on demand from a pluggable
//! [`DataSource`] and presents them as if every row were local, while
//! capping both the number of requests in flight and the number of pages
//! kept in memory.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Presentation layer                       │
//! │           get_row · for_each_row · row_index_at_pixel           │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  RowModel (model/)   resets on data source / sort / filter      │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  CacheEngine (cache/)                                           │
//! │   Pages + LruReplacer + request ceiling + row count estimate    │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                ↓  RowRequest + LoadCallback
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  DataSource (datasource/)   remote, asynchronous, pluggable     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageNumber, SequenceCounter, Error, config)
//! - [`row`] - Rows and placeholders
//! - [`cache`] - The page cache, eviction, notifications and statistics
//! - [`datasource`] - The data source port
//! - [`model`] - Reset orchestration
//!
//! # Quick Start
//! ```
//! use std::sync::Arc;
//! use rowcache::{CacheEngine, CacheOptions, InMemoryDataSource, RowData};
//!
//! let rows = (0..1_000).map(|_| RowData::default()).collect();
//! let source = Arc::new(InMemoryDataSource::new(rows));
//! let engine = CacheEngine::new(CacheOptions::new().page_size(100).build(), source);
//!
//! let row = engine.get_row(150);
//! assert!(row.is_loaded());
//! assert_eq!(engine.row_count(), 201);
//! ```

// Core modules
pub mod cache;
pub mod common;
pub mod datasource;
pub mod model;
pub mod row;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_PAGE_SIZE, DEFAULT_ROW_HEIGHT};
pub use common::{
    CacheConfig, CacheOptions, ConfigWarning, Error, FetchError, PageNumber, ResolvedConfig,
    Result, SequenceCounter,
};

pub use cache::{
    CacheEngine, CacheStats, EngineContext, ListenerRegistry, ModelUpdated, Page, PageState,
    StatsSnapshot, Subscription,
};
pub use datasource::{
    Completion, DataSource, FilterModel, InMemoryDataSource, LoadCallback, RowRequest, SortModel,
};
pub use model::RowModel;
pub use row::{RowData, RowEntity, RowFields, RowId, RowIdFn, RowStatus};

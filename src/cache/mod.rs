//! Page cache management.
//!
//! The cache sits between presentation code and a remote [`DataSource`]:
//! rows are fetched a page at a time, on demand, and held until evicted.
//!
//! # Components
//! - [`CacheEngine`] - The page cache
//! - [`Page`] - One aligned slice of rows plus its load state
//! - [`ListenerRegistry`] / [`Subscription`] - "Model updated" notifications
//! - [`CacheStats`] - Counters
//! - [`replacer`] - Eviction policy implementations
//!
//! [`DataSource`]: crate::datasource::DataSource

mod cache_engine;
mod listener;
mod page;
pub mod replacer;
mod stats;

pub(crate) use cache_engine::EngineShared;
pub use cache_engine::{CacheEngine, EngineContext};
pub use listener::{ListenerRegistry, ModelUpdated, Subscription};
pub use page::{Page, PageState};
pub use stats::{CacheStats, StatsSnapshot};

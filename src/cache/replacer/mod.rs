//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`LruReplacer`] - Global least-recently-used across loaded pages

mod lru;

pub use lru::LruReplacer;

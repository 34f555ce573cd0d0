//! Common types and utilities shared across the row cache.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (raw options, validated snapshot, warnings)
//! - Error types
//! - Identifiers (PageNumber) and the access SequenceCounter

pub mod config;
pub mod error;
mod page_number;
mod sequence;

pub use config::{CacheConfig, CacheOptions, ConfigWarning, ResolvedConfig};
pub use error::{Error, FetchError, Result};
pub use page_number::PageNumber;
pub use sequence::SequenceCounter;

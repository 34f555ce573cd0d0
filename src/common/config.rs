//! Cache configuration.
//!
//! Raw [`CacheOptions`] come from the embedding application (often straight
//! out of JSON). A single defaulting pass turns them into an immutable
//! [`CacheConfig`] snapshot, replacing every out-of-range value with its
//! default and reporting a [`ConfigWarning`] for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{Error, Result};
use crate::datasource::{FilterModel, SortModel};

/// Rows per page when none (or an invalid value) is configured.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// In-flight request ceiling when none (or an invalid value) is configured.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 2;

/// Rows of speculative overflow past the last full page.
pub const DEFAULT_OVERFLOW_SIZE: usize = 1;

/// Row height used when the caller supplies no grid default.
pub const DEFAULT_ROW_HEIGHT: f64 = 25.0;

/// A configuration value that was replaced during resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// The value is outside the field's valid range.
    #[error("{field} = {value} is out of range, using {default}")]
    OutOfRange {
        field: &'static str,
        value: String,
        default: String,
    },

    /// The field still works but has a replacement.
    #[error("{field} is deprecated, use {replacement} instead")]
    Deprecated {
        field: &'static str,
        replacement: &'static str,
    },

    /// The field is not recognised and was ignored.
    #[error("unknown option {0} ignored")]
    UnknownField(String),
}

/// Raw, unvalidated cache options.
///
/// Integers are signed so that nonsense such as `-5` survives parsing and is
/// reported instead of rejected by the deserializer.
///
/// # Example
/// ```
/// use rowcache::CacheOptions;
///
/// let resolved = CacheOptions::from_json(r#"{ "page_size": 0, "overflow_size": 10 }"#)
///     .unwrap()
///     .resolve(None);
///
/// assert_eq!(resolved.config.page_size(), 100);
/// assert_eq!(resolved.config.overflow_size(), 10);
/// assert_eq!(resolved.warnings.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub page_size: Option<i64>,
    pub max_concurrent_requests: Option<i64>,
    pub max_pages_in_cache: Option<i64>,
    pub overflow_size: Option<i64>,
    pub initial_row_count: Option<i64>,
    pub row_height: Option<f64>,

    /// Total row count supplied alongside the data source.
    ///
    /// Superseded by `initial_row_count`.
    pub row_count: Option<i64>,

    #[serde(flatten)]
    unknown: BTreeMap<String, serde_json::Value>,
}

/// The outcome of resolving [`CacheOptions`].
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: CacheConfig,
    pub warnings: Vec<ConfigWarning>,
}

impl CacheOptions {
    /// Empty options; everything resolves to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    ///
    /// # Errors
    /// - `Error::MalformedOptions` if the text is not a JSON object of options
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn page_size(mut self, value: i64) -> Self {
        self.page_size = Some(value);
        self
    }

    pub fn max_concurrent_requests(mut self, value: i64) -> Self {
        self.max_concurrent_requests = Some(value);
        self
    }

    pub fn max_pages_in_cache(mut self, value: i64) -> Self {
        self.max_pages_in_cache = Some(value);
        self
    }

    pub fn overflow_size(mut self, value: i64) -> Self {
        self.overflow_size = Some(value);
        self
    }

    pub fn initial_row_count(mut self, value: i64) -> Self {
        self.initial_row_count = Some(value);
        self
    }

    pub fn row_height(mut self, value: f64) -> Self {
        self.row_height = Some(value);
        self
    }

    /// Resolve leniently: invalid values fall back to their defaults.
    ///
    /// `grid_row_height` is the embedding grid's default row height; when it
    /// is `None` (or itself invalid) [`DEFAULT_ROW_HEIGHT`] is used.
    pub fn resolve(&self, grid_row_height: Option<f64>) -> ResolvedConfig {
        let mut warnings = Vec::new();

        for key in self.unknown.keys() {
            warnings.push(ConfigWarning::UnknownField(key.clone()));
        }

        let page_size = positive(
            "page_size",
            self.page_size,
            DEFAULT_PAGE_SIZE,
            &mut warnings,
        );
        let max_concurrent_requests = positive(
            "max_concurrent_requests",
            self.max_concurrent_requests,
            DEFAULT_MAX_CONCURRENT_REQUESTS,
            &mut warnings,
        );
        let overflow_size = positive(
            "overflow_size",
            self.overflow_size,
            DEFAULT_OVERFLOW_SIZE,
            &mut warnings,
        );

        let max_pages_in_cache = match self.max_pages_in_cache {
            None => None,
            Some(v) if v >= 1 => Some(v as usize),
            Some(v) => {
                warnings.push(ConfigWarning::OutOfRange {
                    field: "max_pages_in_cache",
                    value: v.to_string(),
                    default: "unbounded".into(),
                });
                None
            }
        };

        if self.row_count.is_some() {
            warnings.push(ConfigWarning::Deprecated {
                field: "row_count",
                replacement: "initial_row_count",
            });
        }
        let initial = match (self.initial_row_count, self.row_count) {
            (Some(v), _) => Some(("initial_row_count", v)),
            (None, Some(v)) => Some(("row_count", v)),
            (None, None) => None,
        };
        let initial_row_count = match initial {
            None => 0,
            Some((_, v)) if v >= 1 => v as usize,
            Some((field, v)) => {
                warnings.push(ConfigWarning::OutOfRange {
                    field,
                    value: v.to_string(),
                    default: "0".into(),
                });
                0
            }
        };

        let fallback_height = grid_row_height
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(DEFAULT_ROW_HEIGHT);
        let row_height = match self.row_height {
            None => fallback_height,
            Some(h) if h.is_finite() && h > 0.0 => h,
            Some(h) => {
                warnings.push(ConfigWarning::OutOfRange {
                    field: "row_height",
                    value: h.to_string(),
                    default: fallback_height.to_string(),
                });
                fallback_height
            }
        };

        for warning in &warnings {
            tracing::warn!(%warning, "cache option replaced");
        }

        ResolvedConfig {
            config: CacheConfig {
                page_size,
                max_concurrent_requests,
                max_pages_in_cache,
                overflow_size,
                initial_row_count,
                row_height,
                sort_model: SortModel::default(),
                filter_model: FilterModel::default(),
            },
            warnings,
        }
    }

    /// Resolve strictly: the first warning becomes an error.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` naming the first offending field
    pub fn resolve_strict(&self, grid_row_height: Option<f64>) -> Result<CacheConfig> {
        let resolved = self.resolve(grid_row_height);
        match resolved.warnings.into_iter().next() {
            Some(warning) => Err(Error::InvalidConfig(warning)),
            None => Ok(resolved.config),
        }
    }

    /// Resolve leniently and keep only the snapshot.
    pub fn build(&self) -> CacheConfig {
        self.resolve(None).config
    }
}

fn positive(
    field: &'static str,
    value: Option<i64>,
    default: usize,
    warnings: &mut Vec<ConfigWarning>,
) -> usize {
    match value {
        None => default,
        Some(v) if v >= 1 => v as usize,
        Some(v) => {
            warnings.push(ConfigWarning::OutOfRange {
                field,
                value: v.to_string(),
                default: default.to_string(),
            });
            default
        }
    }
}

/// Immutable configuration for one cache engine.
///
/// Every field is populated and in range; the only way to obtain one is
/// through [`CacheOptions`] (or [`Default`]).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    page_size: usize,
    max_concurrent_requests: usize,
    max_pages_in_cache: Option<usize>,
    overflow_size: usize,
    initial_row_count: usize,
    row_height: f64,
    sort_model: SortModel,
    filter_model: FilterModel,
}

impl CacheConfig {
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    /// Loaded page ceiling, or `None` for unbounded.
    #[inline]
    pub fn max_pages_in_cache(&self) -> Option<usize> {
        self.max_pages_in_cache
    }

    #[inline]
    pub fn overflow_size(&self) -> usize {
        self.overflow_size
    }

    #[inline]
    pub fn initial_row_count(&self) -> usize {
        self.initial_row_count
    }

    #[inline]
    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn sort_model(&self) -> &SortModel {
        &self.sort_model
    }

    pub fn filter_model(&self) -> &FilterModel {
        &self.filter_model
    }

    /// Copy of this snapshot carrying the given sort and filter descriptors.
    pub fn with_models(&self, sort_model: SortModel, filter_model: FilterModel) -> Self {
        Self {
            sort_model,
            filter_model,
            ..self.clone()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheOptions::new().resolve(None).config
    }
}

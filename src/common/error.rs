//! Error types for the row cache.

use thiserror::Error;

use crate::common::config::ConfigWarning;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the row cache.
///
/// Most of the cache is infallible by construction: bad configuration is
/// defaulted, fetch failures are recorded on the page, and stale completions
/// are discarded. These variants cover option parsing and strict resolution.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value was rejected by the strict resolver.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigWarning),

    /// Options could not be parsed at all.
    #[error("malformed options: {0}")]
    MalformedOptions(#[from] serde_json::Error),
}

/// Reason a data source gives when a row request fails.
///
/// The message is kept on the failed page and repeated on every placeholder
/// served from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The backing service reported an error.
    #[error("data source error: {0}")]
    Source(String),

    /// The request was abandoned before it produced a result.
    #[error("request abandoned")]
    Abandoned,
}

impl FetchError {
    /// A [`FetchError::Source`] carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        FetchError::Source(message.into())
    }
}

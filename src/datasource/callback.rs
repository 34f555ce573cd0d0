//! Completion handle passed to data sources.

use std::fmt;
use std::sync::Weak;

use crate::cache::EngineShared;
use crate::common::{FetchError, PageNumber};
use crate::row::RowData;

/// What happened to a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result was applied to the cache.
    Applied,
    /// The cache was reset or dropped before the result arrived; it was discarded.
    Stale,
}

pub(crate) enum Outcome {
    Rows {
        rows: Vec<RowData>,
        last_row: Option<usize>,
    },
    Failed(FetchError),
}

/// Completion hooks for one page fetch.
///
/// `success` and `failure` consume the handle, so a fetch can complete at
/// most once. Dropping the handle without completing it reports
/// [`FetchError::Abandoned`].
#[must_use = "a fetch stays in flight until its callback is completed"]
pub struct LoadCallback {
    engine: Weak<EngineShared>,
    page: PageNumber,
    token: u64,
    done: bool,
}

impl LoadCallback {
    pub(crate) fn new(engine: Weak<EngineShared>, page: PageNumber, token: u64) -> Self {
        Self {
            engine,
            page,
            token,
            done: false,
        }
    }

    /// The page this callback completes.
    #[inline]
    pub fn page(&self) -> PageNumber {
        self.page
    }

    /// Deliver rows.
    ///
    /// Fewer rows than requested marks the end of the data. `last_row`, when
    /// the source knows it, is the total number of rows (one past the last
    /// row index) and replaces the overflow estimate.
    pub fn success(mut self, rows: Vec<RowData>, last_row: Option<usize>) -> Completion {
        self.finish(Outcome::Rows { rows, last_row })
    }

    /// Report that the rows could not be fetched.
    pub fn failure(mut self, error: FetchError) -> Completion {
        self.finish(Outcome::Failed(error))
    }

    fn finish(&mut self, outcome: Outcome) -> Completion {
        if std::mem::replace(&mut self.done, true) {
            return Completion::Stale;
        }
        match self.engine.upgrade() {
            Some(engine) => engine.complete(self.page, self.token, outcome),
            None => Completion::Stale,
        }
    }
}

impl Drop for LoadCallback {
    fn drop(&mut self) {
        if !self.done {
            self.finish(Outcome::Failed(FetchError::Abandoned));
        }
    }
}

impl fmt::Debug for LoadCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCallback")
            .field("page", &self.page)
            .field("token", &self.token)
            .field("done", &self.done)
            .finish()
    }
}

//! Page - one aligned slice of the virtual row space.
//!
//! A [`Page`] holds the rows of `page_size` consecutive indices plus the
//! metadata the cache needs to manage it:
//! - Load state (NotLoaded → Loading → Loaded | Failed)
//! - Last-access stamp for eviction
//! - Token of the fetch attempt in flight

use std::fmt;

use crate::common::{PageNumber, SequenceCounter};
use crate::row::{RowEntity, RowStatus};

/// Load state of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Created, waiting for a request slot.
    NotLoaded,
    /// A fetch is in flight.
    Loading,
    /// Rows are present.
    Loaded,
    /// The fetch failed; the page stays failed until the cache is reset.
    Failed(String),
}

impl PageState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, PageState::Loaded)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::NotLoaded => write!(f, "not-loaded"),
            PageState::Loading => write!(f, "loading"),
            PageState::Loaded => write!(f, "loaded"),
            PageState::Failed(_) => write!(f, "failed"),
        }
    }
}

/// A page of the cache.
///
/// `rows` is non-empty only in [`PageState::Loaded`]; it may hold fewer than
/// `page_size` rows when this is the last page of the data.
#[derive(Debug)]
pub struct Page {
    number: PageNumber,
    start_row: usize,
    page_size: usize,
    state: PageState,
    rows: Vec<RowEntity>,
    last_accessed: u64,
    load_token: Option<u64>,
}

impl Page {
    /// Create an unloaded page, stamped as just accessed.
    pub fn new(number: PageNumber, page_size: usize) -> Self {
        Self {
            number,
            start_row: number.start_row(page_size),
            page_size,
            state: PageState::NotLoaded,
            rows: Vec::new(),
            last_accessed: SequenceCounter::global().next(),
            load_token: None,
        }
    }

    #[inline]
    pub fn number(&self) -> PageNumber {
        self.number
    }

    #[inline]
    pub fn start_row(&self) -> usize {
        self.start_row
    }

    /// Last row index covered, inclusive.
    #[inline]
    pub fn end_row(&self) -> usize {
        self.start_row.saturating_add(self.page_size - 1)
    }

    /// Rows this page can hold; below `page_size` only for the clamped last page.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.end_row() - self.start_row + 1
    }

    #[inline]
    pub fn state(&self) -> &PageState {
        &self.state
    }

    #[inline]
    pub fn last_accessed(&self) -> u64 {
        self.last_accessed
    }

    /// Number of rows held.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Stamp the page as accessed now. Returns the new stamp.
    pub fn touch(&mut self) -> u64 {
        self.last_accessed = SequenceCounter::global().next();
        self.last_accessed
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// NotLoaded → Loading. Returns false if the page is in any other state.
    pub fn begin_load(&mut self, token: u64) -> bool {
        if self.state != PageState::NotLoaded {
            return false;
        }
        self.state = PageState::Loading;
        self.load_token = Some(token);
        true
    }

    /// Whether `token` identifies the fetch currently in flight.
    #[inline]
    pub fn is_awaiting(&self, token: u64) -> bool {
        self.state.is_loading() && self.load_token == Some(token)
    }

    /// Loading → Loaded.
    pub fn complete(&mut self, rows: Vec<RowEntity>) {
        debug_assert!(self.state.is_loading(), "{} completed while {}", self.number, self.state);
        debug_assert!(rows.len() <= self.page_size);
        self.rows = rows;
        self.state = PageState::Loaded;
        self.load_token = None;
    }

    /// Loading → Failed.
    pub fn fail(&mut self, reason: String) {
        debug_assert!(self.state.is_loading(), "{} failed while {}", self.number, self.state);
        self.rows.clear();
        self.state = PageState::Failed(reason);
        self.load_token = None;
    }

    // ========================================================================
    // Row access
    // ========================================================================

    /// Whether `index` falls inside this page's range.
    #[inline]
    pub fn covers(&self, index: usize) -> bool {
        index >= self.start_row && index <= self.end_row()
    }

    /// The row at absolute `index`, or a placeholder describing why there is none.
    pub fn row(&self, index: usize, row_height: f64) -> RowEntity {
        debug_assert!(self.covers(index));
        match &self.state {
            PageState::Loaded => match self.rows.get(index - self.start_row) {
                Some(row) => row.clone(),
                None => RowEntity::placeholder(index, row_height, RowStatus::OutOfRange),
            },
            PageState::Failed(reason) => {
                RowEntity::placeholder(index, row_height, RowStatus::Failed(reason.clone()))
            }
            PageState::NotLoaded | PageState::Loading => {
                RowEntity::placeholder(index, row_height, RowStatus::Pending)
            }
        }
    }
}

//! Page number type.

use std::fmt;

/// Identifies a page of the virtual row space.
///
/// Page `n` covers the absolute rows `n * page_size ..= n * page_size + page_size - 1`,
/// so every page boundary is `page_size`-aligned.
///
/// # Example
/// ```
/// use rowcache::PageNumber;
///
/// let page = PageNumber::containing(250, 100);
/// assert_eq!(page, PageNumber::new(2));
/// assert_eq!(page.start_row(100), 200);
/// assert_eq!(page.end_row(100), 299);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageNumber(pub usize);

impl PageNumber {
    /// Create a new PageNumber.
    #[inline]
    pub fn new(number: usize) -> Self {
        PageNumber(number)
    }

    /// The page that owns `row_index` for the given page size.
    #[inline]
    pub fn containing(row_index: usize, page_size: usize) -> Self {
        PageNumber(row_index / page_size)
    }

    /// First absolute row index covered by this page.
    #[inline]
    pub fn start_row(&self, page_size: usize) -> usize {
        self.0.saturating_mul(page_size)
    }

    /// Last absolute row index covered by this page (inclusive).
    ///
    /// The last page of the index space is clamped to `usize::MAX`.
    #[inline]
    pub fn end_row(&self, page_size: usize) -> usize {
        self.start_row(page_size).saturating_add(page_size - 1)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}

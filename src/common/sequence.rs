//! Process-wide access sequence.

use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL: SequenceCounter = SequenceCounter::new();

/// A monotonically increasing counter used to timestamp page accesses.
///
/// Values only ever grow, so comparing two stamps orders the accesses that
/// produced them. Least-recently-used eviction picks the smallest stamp.
///
/// # Example
/// ```
/// use rowcache::SequenceCounter;
///
/// let first = SequenceCounter::global().next();
/// let second = SequenceCounter::global().next();
/// assert!(second > first);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    next: AtomicU64,
}

impl SequenceCounter {
    /// Create a counter starting at zero.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// The counter shared by every cache in the process.
    pub fn global() -> &'static SequenceCounter {
        &GLOBAL
    }

    /// Take the next stamp.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The stamp the next call to [`next`](Self::next) will hand out.
    #[inline]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

//! LRU (Least Recently Used) replacement policy.

use std::collections::{BTreeMap, HashMap};

use crate::common::PageNumber;

/// A least-recently-used eviction policy over pages.
///
/// Only pages marked evictable (loaded pages) are candidates. Victims come
/// out in ascending order of their last access stamp.
#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Access stamp of every tracked page.
    stamps: HashMap<PageNumber, u64>,

    /// Evictable pages ordered by stamp (front = least recently used).
    ///
    /// Stamps are unique, so the stamp alone is a valid key.
    order: BTreeMap<u64, PageNumber>,
}

impl LruReplacer {
    /// Create a new LRU replacer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a page was accessed at `stamp`.
    pub fn record_access(&mut self, page: PageNumber, stamp: u64) {
        if let Some(old) = self.stamps.insert(page, stamp) {
            if self.order.remove(&old).is_some() {
                self.order.insert(stamp, page);
            }
        }
    }

    /// Mark a tracked page as evictable or not.
    pub fn set_evictable(&mut self, page: PageNumber, evictable: bool) {
        let Some(&stamp) = self.stamps.get(&page) else {
            return;
        };
        if evictable {
            self.order.insert(stamp, page);
        } else {
            self.order.remove(&stamp);
        }
    }

    /// Select a victim page for eviction.
    ///
    /// Returns the evictable page with the oldest stamp, or None if there is none.
    pub fn evict(&mut self) -> Option<PageNumber> {
        let (_, page) = self.order.pop_first()?;
        self.stamps.remove(&page);
        Some(page)
    }

    /// Stop tracking a page entirely.
    pub fn remove(&mut self, page: PageNumber) {
        if let Some(stamp) = self.stamps.remove(&page) {
            self.order.remove(&stamp);
        }
    }

    /// Number of evictable pages.
    pub fn size(&self) -> usize {
        self.order.len()
    }

    /// Forget every page.
    pub fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> PageNumber {
        PageNumber::new(n)
    }

    #[test]
    fn test_lru_basic() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(page(0), 1);
        replacer.record_access(page(1), 2);
        replacer.record_access(page(2), 3);

        replacer.set_evictable(page(0), true);
        replacer.set_evictable(page(1), true);
        replacer.set_evictable(page(2), true);

        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(page(0)));
        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), Some(page(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_reaccess_reorders() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(page(0), 1);
        replacer.record_access(page(1), 2);
        replacer.set_evictable(page(0), true);
        replacer.set_evictable(page(1), true);

        // Access page 0 again; page 1 is now the oldest
        replacer.record_access(page(0), 3);

        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), Some(page(0)));
    }

    #[test]
    fn test_lru_skips_non_evictable() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(page(0), 1);
        replacer.record_access(page(1), 2);
        replacer.record_access(page(2), 3);

        // Only page 1 is evictable
        replacer.set_evictable(page(1), true);

        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_access_while_not_evictable() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(page(0), 1);
        replacer.record_access(page(1), 2);
        replacer.set_evictable(page(1), true);

        // Stamp updated while not evictable, then made evictable
        replacer.record_access(page(0), 5);
        replacer.set_evictable(page(0), true);

        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), Some(page(0)));
    }

    #[test]
    fn test_lru_remove() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(page(0), 1);
        replacer.record_access(page(1), 2);
        replacer.set_evictable(page(0), true);
        replacer.set_evictable(page(1), true);

        replacer.remove(page(0));

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(page(1)));
    }

    #[test]
    fn test_set_evictable_untracked_is_noop() {
        let mut replacer = LruReplacer::new();
        replacer.set_evictable(page(9), true);
        assert_eq!(replacer.size(), 0);
    }
}

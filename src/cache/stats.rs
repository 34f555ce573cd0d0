//! Cache statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by a cache engine.
///
/// All fields are atomic so they can be read without taking the engine lock.
/// `Ordering::Relaxed` is enough: counters are independent and only need
/// atomicity.
///
/// # Example
/// ```
/// use rowcache::CacheStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = CacheStats::new();
/// stats.hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Row lookups answered from a loaded page.
    pub hits: AtomicU64,

    /// Row lookups answered with a placeholder, out-of-range ones included.
    pub misses: AtomicU64,

    /// Requests handed to the data source.
    pub fetches: AtomicU64,

    /// Fetch attempts postponed because every request slot was busy.
    pub deferred: AtomicU64,

    /// Pages that finished loading.
    pub pages_loaded: AtomicU64,

    /// Pages whose fetch failed.
    pub pages_failed: AtomicU64,

    /// Loaded pages discarded to respect the page ceiling.
    pub evictions: AtomicU64,

    /// Completions discarded because they arrived after a reset.
    pub stale_completions: AtomicU64,
}

impl CacheStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of row lookups served from loaded pages (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            pages_loaded: self.pages_loaded.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            stale_completions: self.stale_completions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub deferred: u64,
    pub pages_loaded: u64,
    pub pages_failed: u64,
    pub evictions: u64,
    pub stale_completions: u64,
}

impl StatsSnapshot {
    /// Fraction of row lookups served from loaded pages (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, fetches: {}, evictions: {}, hit_rate: {:.2}% }}",
            self.hits,
            self.misses,
            self.fetches,
            self.evictions,
            self.hit_rate() * 100.0
        )
    }
}

//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Why an entry left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Unused past the idle threshold
    Idle,
    /// Explicit `remove`
    Removed,
    /// Cache shutdown
    Shutdown,
}

impl EvictionReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Removed => "removed",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served by an existing handle
    pub hits: u64,
    /// Lookups that created a new handle
    pub misses: u64,
    pub creation_errors: u64,
    /// Entries removed for any reason
    pub evictions: u64,
    pub close_errors: u64,
    pub entry_count: u64,
}

/// Live counters behind [`CacheStats`]
///
/// Updated outside the entry lock, so a snapshot taken during concurrent
/// access may lag the map by a few operations.
#[derive(Debug)]
pub(crate) struct CacheCounters {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    driver: String,
    hits: AtomicU64,
    misses: AtomicU64,
    creation_errors: AtomicU64,
    evictions: AtomicU64,
    close_errors: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            creation_errors: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            close_errors: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        {
            crate::observability::record_hit(&self.driver);
        }
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        {
            crate::observability::record_miss(&self.driver);
        }
    }

    pub(crate) fn record_creation_error(&self) {
        self.creation_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        {
            crate::observability::record_creation_error(&self.driver);
        }
    }

    pub(crate) fn record_evictions(&self, reason: EvictionReason, count: usize) {
        if count == 0 {
            return;
        }
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        {
            crate::observability::record_evictions(&self.driver, reason, count as u64);
        }
        #[cfg(not(feature = "metrics"))]
        {
            let _ = reason;
        }
    }

    pub(crate) fn record_close_error(&self) {
        self.close_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        {
            crate::observability::record_close_error(&self.driver);
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(clippy::unused_self))]
    pub(crate) fn set_entry_count(&self, count: usize) {
        #[cfg(feature = "metrics")]
        {
            crate::observability::set_entry_count(&self.driver, count);
        }
        #[cfg(not(feature = "metrics"))]
        {
            let _ = count;
        }
    }

    pub(crate) fn snapshot(&self, entry_count: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            creation_errors: self.creation_errors.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            close_errors: self.close_errors.load(Ordering::Relaxed),
            entry_count: entry_count as u64,
        }
    }
}

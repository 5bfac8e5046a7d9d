//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a cache manager and every queryset it hands out
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Materializations answered from a snapshot
    hits: AtomicU64,
    /// Materializations delegated to the authoritative source
    misses: AtomicU64,
    /// Derivations that dropped the snapshot because the query was too complex
    fallbacks: AtomicU64,
    /// Snapshots loaded
    loads: AtomicU64,
    /// Registry resets
    invalidations: AtomicU64,
    /// Snapshots currently registered
    snapshot_count: AtomicU64,
}

impl CacheStats {
    /// Create zeroed cache statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query answered from a snapshot
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a query delegated to the source
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a derivation that dropped its snapshot
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a snapshot load
    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a registry reset
    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the number of registered snapshots
    pub fn set_snapshot_count(&self, count: u64) {
        self.snapshot_count.store(count, Ordering::Relaxed);
    }

    /// Get hit count
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get miss count
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get fallback count
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Get snapshot load count
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Get invalidation count
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Get current snapshot count
    pub fn snapshot_count(&self) -> u64 {
        self.snapshot_count.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Get total materializations (hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Reset the event counters; the snapshot gauge is left alone
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.misses()),
            fallbacks: AtomicU64::new(self.fallbacks()),
            loads: AtomicU64::new(self.loads()),
            invalidations: AtomicU64::new(self.invalidations()),
            snapshot_count: AtomicU64::new(self.snapshot_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = CacheStats::new();

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_fallback();

        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.fallbacks(), 1);
        assert_eq!(stats.total_requests(), 3);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new();

        // Empty stats should return 0.0
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();

        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_keeps_gauge() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_load();
        stats.record_invalidation();
        stats.set_snapshot_count(2);

        stats.reset();

        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.loads(), 0);
        assert_eq!(stats.invalidations(), 0);
        assert_eq!(stats.snapshot_count(), 2);
    }

    #[test]
    fn test_clone() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();

        let cloned = stats.clone();
        stats.record_hit();

        assert_eq!(cloned.hits(), 1);
        assert_eq!(cloned.misses(), 1);
        assert_eq!(stats.hits(), 2);
    }
}

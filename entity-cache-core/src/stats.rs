use std::sync::atomic::{AtomicU64, Ordering};

/// Access statistics for one cache instance.
///
/// Entity lookups and list lookups are counted separately, since their hit rates tell
/// different stories: entity misses are usually first loads, list misses are usually the
/// result of write-driven expiry.
///
/// `suppressed_faults` counts internal inconsistencies the cache absorbed instead of
/// surfacing to the caller, such as a typed lookup finding a handle it cannot downcast.
/// Outside of bugs it stays at zero.
///
/// All counters use `Relaxed` atomics.
///
/// # Examples
///
/// ```
/// use entity_cache_core::CacheStats;
///
/// let stats = CacheStats::new();
/// stats.record_entity_hit();
/// stats.record_entity_hit();
/// stats.record_entity_miss();
/// stats.record_list_miss();
///
/// assert_eq!(stats.entity_hits(), 2);
/// assert_eq!(stats.total_accesses(), 4);
/// assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    entity_hits: AtomicU64,
    entity_misses: AtomicU64,
    list_hits: AtomicU64,
    list_misses: AtomicU64,
    suppressed_faults: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self {
            entity_hits: AtomicU64::new(0),
            entity_misses: AtomicU64::new(0),
            list_hits: AtomicU64::new(0),
            list_misses: AtomicU64::new(0),
            suppressed_faults: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_entity_hit(&self) {
        self.entity_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_entity_miss(&self) {
        self.entity_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_list_hit(&self) {
        self.list_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_list_miss(&self) {
        self.list_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_suppressed_fault(&self) {
        self.suppressed_faults.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn entity_hits(&self) -> u64 {
        self.entity_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entity_misses(&self) -> u64 {
        self.entity_misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn list_hits(&self) -> u64 {
        self.list_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn list_misses(&self) -> u64 {
        self.list_misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn suppressed_faults(&self) -> u64 {
        self.suppressed_faults.load(Ordering::Relaxed)
    }

    /// Entity and list lookups combined.
    pub fn total_accesses(&self) -> u64 {
        self.entity_hits() + self.entity_misses() + self.list_hits() + self.list_misses()
    }

    /// Fraction of all lookups that hit, `0.0` when nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            (self.entity_hits() + self.list_hits()) as f64 / total as f64
        }
    }

    pub fn reset(&self) {
        self.entity_hits.store(0, Ordering::Relaxed);
        self.entity_misses.store(0, Ordering::Relaxed);
        self.list_hits.store(0, Ordering::Relaxed);
        self.list_misses.store(0, Ordering::Relaxed);
        self.suppressed_faults.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            entity_hits: AtomicU64::new(self.entity_hits()),
            entity_misses: AtomicU64::new(self.entity_misses()),
            list_hits: AtomicU64::new(self.list_hits()),
            list_misses: AtomicU64::new(self.list_misses()),
            suppressed_faults: AtomicU64::new(self.suppressed_faults()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = CacheStats::new();
        assert_eq!(stats.total_accesses(), 0);
        assert_eq!(stats.suppressed_faults(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_entity_and_list_counted_separately() {
        let stats = CacheStats::new();
        stats.record_entity_hit();
        stats.record_list_miss();
        stats.record_list_miss();
        assert_eq!(stats.entity_hits(), 1);
        assert_eq!(stats.entity_misses(), 0);
        assert_eq!(stats.list_hits(), 0);
        assert_eq!(stats.list_misses(), 2);
        assert!((stats.hit_rate() - 0.3333).abs() < 0.001);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.record_entity_hit();
        stats.record_suppressed_fault();
        stats.reset();
        assert_eq!(stats.total_accesses(), 0);
        assert_eq!(stats.suppressed_faults(), 0);
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let stats = CacheStats::new();
        stats.record_entity_miss();

        let snapshot = stats.clone();
        stats.record_entity_miss();
        assert_eq!(stats.entity_misses(), 2);
        assert_eq!(snapshot.entity_misses(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(CacheStats::new());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_entity_hit();
                    }
                    for _ in 0..50 {
                        stats.record_list_miss();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.entity_hits(), 1000);
        assert_eq!(stats.list_misses(), 500);
        assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
    }
}

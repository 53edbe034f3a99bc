use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated outside the entry lock.
#[derive(Default, Debug)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub removes: AtomicU64,
    pub expirations: AtomicU64,
    pub evictions: AtomicU64,
    pub decode_failures: AtomicU64,
}

impl CacheMetrics {
    pub fn reset(&self) {
        for c in [
            &self.hits,
            &self.misses,
            &self.inserts,
            &self.removes,
            &self.expirations,
            &self.evictions,
            &self.decode_failures,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Sum of uncompressed entry sizes; bounded by `max_size_bytes` after cleanup.
    pub total_bytes: u64,
    pub entry_count: u64,
    /// Bytes actually held, after compression.
    pub stored_bytes: u64,
    pub compressed_entries: u64,
    pub inserts: u64,
    pub removes: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub decode_failures: u64,
}

impl CacheStatistics {
    /// `hits / (hits + misses)`, 0 before any access.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_no_accesses() {
        assert_eq!(CacheStatistics::default().hit_rate(), 0.0);
        let s = CacheStatistics { hits: 3, misses: 1, ..Default::default() };
        assert!((s.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}

//! Cache counters.

/// Statistics about geo result cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served by the volatile tier.
    pub memory_hits: u64,
    /// Reads served by a young persisted entry.
    pub persisted_hits: u64,
    /// Successful origin fetches.
    pub origin_fetches: u64,
    /// Failed origin fetches.
    pub origin_failures: u64,
    /// Origin failures answered with an older result.
    pub stale_served: u64,
    /// Expired persisted entries removed after a successful refetch.
    pub expired_evictions: u64,
}

impl CacheStats {
    /// Fraction of reads answered without a successful origin fetch (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.persisted_hits;
        let total = hits + self.origin_fetches;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            memory_hits: 50,
            persisted_hits: 30,
            origin_fetches: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}

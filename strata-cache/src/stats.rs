//! Cache usage statistics

use serde::{Deserialize, Serialize};

/// Statistics about cache usage, cumulative since the last `clear()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of lookups served from a live entry.
    pub hits: u64,
    /// Number of lookups that ran the computation.
    pub misses: u64,
    /// Number of entries currently live.
    pub entry_count: u64,
    /// Number of entries evicted to make room at capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0). Zero when no lookups occurred.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty = CacheStats::default();
        assert!((empty.hit_rate() - 0.0).abs() < 0.001);
    }
}

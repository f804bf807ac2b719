//! Cache configuration

use std::time::Duration;

/// Configuration for the cache service.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a caller omits one.
    pub default_ttl: Duration,
    /// Maximum number of live entries. When full, the entry closest to
    /// expiry is evicted to make room.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300), // 5 minutes
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the max entry count.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Create CacheConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STRATA_CACHE_DEFAULT_TTL_SECS`: default entry TTL (default: 300)
    /// - `STRATA_CACHE_MAX_ENTRIES`: max live entries (default: 10000)
    pub fn from_env() -> Self {
        let default_ttl = std::env::var("STRATA_CACHE_DEFAULT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let max_entries = std::env::var("STRATA_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10_000);

        Self {
            default_ttl,
            max_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_default_ttl(Duration::from_secs(60))
            .with_max_entries(500);

        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.max_entries, 500);
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.max_entries, 10_000);
    }
}

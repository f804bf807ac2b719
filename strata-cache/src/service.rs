//! Cache service
//!
//! Read-through caching over caller-supplied async computations. The entry
//! map, tag index, and counters live behind one tokio `RwLock`; the lock
//! is never held across the computation itself, so two concurrent misses
//! for the same key both run their computation and the later completion
//! wins. Computation failures propagate unchanged and are never cached.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use strata_core::{CacheError, StrataResult};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::stats::CacheStats;
use crate::tag_index::TagIndex;

/// Per-call cache options: TTL override and invalidation tags.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// TTL for the stored entry; the config default applies when omitted.
    pub ttl: Option<Duration>,
    /// Tags registered for the stored entry.
    pub tags: Vec<String>,
}

impl CacheOptions {
    /// Options with no TTL override and no tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replace the tag set.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    tag_index: TagIndex,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheInner {
    /// Remove an entry and repair the tag index. Returns whether it existed.
    fn remove_entry(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.remove(key) {
            self.tag_index.remove(key, &entry.tags);
            true
        } else {
            false
        }
    }

    /// Evict the live entry closest to expiry to make room.
    fn evict_one(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            debug!(key = %key, "cache capacity reached, evicting entry");
            self.remove_entry(&key);
            self.evictions += 1;
        }
    }
}

/// TTL- and tag-based cache wrapping arbitrary async computations.
///
/// # Example
///
/// ```ignore
/// let cache = CacheService::new(CacheConfig::default());
/// let analytics: UserAnalytics = cache
///     .get(
///         &format!("user-analytics:{user_id}"),
///         || async { compute_analytics(user_id).await },
///         CacheOptions::new()
///             .with_ttl(Duration::from_secs(120))
///             .with_tag(format!("user:{user_id}")),
///     )
///     .await?;
/// ```
pub struct CacheService {
    inner: RwLock<CacheInner>,
    config: CacheConfig,
}

impl CacheService {
    /// Create a cache service with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            config,
        }
    }

    /// Create a cache service with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key`, or run `compute` and store its
    /// result.
    ///
    /// A live entry counts as a hit and is returned as-is. Otherwise the
    /// computation runs (a miss is counted first), its result is stored
    /// under `key` with `expires_at = now + ttl` and the given tags, and
    /// returned. An expired entry observed here is removed before the
    /// recompute. Computation failures propagate unchanged; nothing is
    /// stored for them.
    pub async fn get<T, F, Fut>(
        &self,
        key: &str,
        compute: F,
        options: CacheOptions,
    ) -> StrataResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = StrataResult<T>>,
    {
        let now = Utc::now();

        {
            let mut inner = self.inner.write().await;
            match inner.entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    let value = entry.value.clone();
                    inner.hits += 1;
                    return serde_json::from_value(value).map_err(|e| {
                        CacheError::DeserializeFailed {
                            key: key.to_string(),
                            reason: e.to_string(),
                        }
                        .into()
                    });
                }
                Some(_) => {
                    // Expired: treated as absent, removed before recompute.
                    inner.remove_entry(key);
                    inner.misses += 1;
                }
                None => {
                    inner.misses += 1;
                }
            }
        }

        // Lock dropped: concurrent misses for the same key each compute.
        let value = compute().await?;

        let serialized =
            serde_json::to_value(&value).map_err(|e| CacheError::SerializeFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        let stored_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|delta| stored_at.checked_add_signed(delta))
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);

        let mut inner = self.inner.write().await;
        // A concurrent fill may have landed; latest completion wins.
        inner.remove_entry(key);
        if inner.entries.len() >= self.config.max_entries {
            inner.evict_one();
        }
        inner.tag_index.insert(key, &options.tags);
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value: serialized,
                tags: options.tags.into_iter().collect(),
                created_at: stored_at,
                expires_at,
            },
        );

        Ok(value)
    }

    /// Remove every entry whose tag set intersects `tags`.
    ///
    /// Returns the number of entries removed. Only this instance's view is
    /// affected.
    pub async fn invalidate_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let mut inner = self.inner.write().await;
        let keys = inner.tag_index.keys_for_any(tags);
        let mut removed = 0;
        for key in keys {
            if inner.remove_entry(&key) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "invalidated cache entries by tag");
        }
        removed
    }

    /// Remove a single entry by key. Returns whether it existed.
    pub async fn invalidate_key(&self, key: &str) -> bool {
        self.inner.write().await.remove_entry(key)
    }

    /// Whether a live (unexpired) entry exists for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Utc::now()))
    }

    /// Remove every expired entry. Returns the number removed.
    ///
    /// Expiry is already enforced lazily on read; this exists for callers
    /// that want to reclaim memory on a schedule.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        let count = expired.len();
        for key in expired {
            inner.remove_entry(&key);
        }
        if count > 0 {
            debug!(count, "swept expired cache entries");
        }
        count
    }

    /// Cumulative statistics since the last `clear()`.
    pub async fn get_stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entry_count: inner.entries.len() as u64,
            evictions: inner.evictions,
        }
    }

    /// Number of live entries (expired-but-unswept entries included).
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Reset entries, tag index, and statistics to empty.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.tag_index.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use strata_core::{StoreError, StrataError};

    fn counting_compute(
        counter: Arc<AtomicUsize>,
        result: &'static str,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = StrataResult<String>> + Send>> {
        move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(result.to_string())
            })
        }
    }

    #[tokio::test]
    async fn test_second_get_within_ttl_is_a_hit() {
        let cache = CacheService::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));

        let a: String = cache
            .get("k", counting_compute(calls.clone(), "v"), CacheOptions::new())
            .await
            .unwrap();
        let b: String = cache
            .get("k", counting_compute(calls.clone(), "v"), CacheOptions::new())
            .await
            .unwrap();

        assert_eq!(a, "v");
        assert_eq!(b, "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.get_stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let cache = CacheService::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        let options = CacheOptions::new().with_ttl(Duration::from_millis(10));

        let _: String = cache
            .get("k", counting_compute(calls.clone(), "v"), options.clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(25)).await;

        let _: String = cache
            .get("k", counting_compute(calls.clone(), "v"), options)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = cache.get_stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_invalidate_by_tags_scope() {
        let cache = CacheService::with_defaults();

        let _: String = cache
            .get(
                "a",
                || async { Ok("1".to_string()) },
                CacheOptions::new().with_tag("user:1"),
            )
            .await
            .unwrap();
        let _: String = cache
            .get(
                "b",
                || async { Ok("2".to_string()) },
                CacheOptions::new().with_tag("user:1").with_tag("analytics"),
            )
            .await
            .unwrap();
        let _: String = cache
            .get(
                "c",
                || async { Ok("3".to_string()) },
                CacheOptions::new().with_tag("user:2"),
            )
            .await
            .unwrap();

        let removed = cache.invalidate_by_tags(&["user:1"]).await;
        assert_eq!(removed, 2);
        assert!(!cache.contains("a").await);
        assert!(!cache.contains("b").await);
        assert!(cache.contains("c").await);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let cache = CacheService::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<String, _>(StrataError::Store(StoreError::ConnectionFailed {
                        reason: "refused".to_string(),
                    }))
                }
            }
        };

        let result: StrataResult<String> = cache
            .get("k", failing.clone(), CacheOptions::new())
            .await;
        assert!(result.is_err());
        assert!(!cache.contains("k").await);

        // Second call recomputes rather than serving a poisoned entry.
        let result: StrataResult<String> = cache.get("k", failing, CacheOptions::new()).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_compute() {
        let cache = Arc::new(CacheService::with_defaults());
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |cache: Arc<CacheService>, calls: Arc<AtomicUsize>| async move {
            cache
                .get(
                    "k",
                    || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok("v".to_string())
                    },
                    CacheOptions::new(),
                )
                .await
        };

        let (a, b) = tokio::join!(
            make(cache.clone(), calls.clone()),
            make(cache.clone(), calls.clone())
        );
        assert_eq!(a.unwrap(), "v");
        assert_eq!(b.unwrap(), "v");
        // No single-flight: both misses run the computation.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_eviction_prefers_earliest_expiry() {
        let cache = CacheService::new(CacheConfig::new().with_max_entries(2));

        let _: String = cache
            .get(
                "short",
                || async { Ok("1".to_string()) },
                CacheOptions::new().with_ttl(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        let _: String = cache
            .get(
                "long",
                || async { Ok("2".to_string()) },
                CacheOptions::new().with_ttl(Duration::from_secs(600)),
            )
            .await
            .unwrap();
        let _: String = cache
            .get(
                "third",
                || async { Ok("3".to_string()) },
                CacheOptions::new().with_ttl(Duration::from_secs(600)),
            )
            .await
            .unwrap();

        assert!(!cache.contains("short").await);
        assert!(cache.contains("long").await);
        assert!(cache.contains("third").await);
        assert_eq!(cache.get_stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_sweep_expired_removes_entries() {
        let cache = CacheService::with_defaults();
        let _: String = cache
            .get(
                "k1",
                || async { Ok("1".to_string()) },
                CacheOptions::new().with_ttl(Duration::from_millis(5)),
            )
            .await
            .unwrap();
        let _: String = cache
            .get(
                "k2",
                || async { Ok("2".to_string()) },
                CacheOptions::new().with_ttl(Duration::from_secs(600)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(15)).await;

        assert_eq!(cache.sweep_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains("k2").await);
    }

    #[tokio::test]
    async fn test_clear_resets_stats_and_entries() {
        let cache = CacheService::with_defaults();
        let _: String = cache
            .get("k", || async { Ok("v".to_string()) }, CacheOptions::new())
            .await
            .unwrap();
        let _: String = cache
            .get("k", || async { Ok("v".to_string()) }, CacheOptions::new())
            .await
            .unwrap();

        cache.clear().await;

        assert!(cache.is_empty().await);
        let stats = cache.get_stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}

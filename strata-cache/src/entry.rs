//! Cache entry record

use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A single cached value with its expiry and tags.
///
/// Owned exclusively by the cache service; mutated only through `get`,
/// tag invalidation, and the expiry sweep.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value, stored serialized.
    pub value: serde_json::Value,
    /// Tags for group invalidation.
    pub tags: HashSet<String>,
    /// When the entry was stored.
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry must no longer be returned at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

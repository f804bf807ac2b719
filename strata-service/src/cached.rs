//! Cached query facade
//!
//! Domain-level reads combining the cache service and per-table query
//! executors. Cache keys are deterministic from the query name and
//! parameters; every entry carries an entity-scoped tag (`user:<id>`) so
//! one tag invalidation evicts all cached artifacts for that user, no
//! matter how many distinct keys they were stored under.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use strata_cache::{CacheOptions, CacheService, CacheStats};
use strata_core::{CursorPage, FilterExpr, Row, StoreError, StrataResult};
use strata_query::{CursorOptions, PerformanceMonitor, QueryExecutor, StoreAdapter};

use crate::types::{ConversionRecord, UserAnalytics, UserProfile};

const USERS_TABLE: &str = "users";
const CONVERSIONS_TABLE: &str = "conversions";
const STATS_RPC: &str = "user_conversion_stats";

/// TTL for aggregated analytics; recomputation is expensive.
const ANALYTICS_TTL: Duration = Duration::from_secs(120);
/// TTL for profile reads; profiles change rarely.
const PROFILE_TTL: Duration = Duration::from_secs(300);
/// TTL for the first recent-conversions page; it goes stale fastest.
const RECENT_TTL: Duration = Duration::from_secs(30);

/// Domain facade over cache + executors.
pub struct CachedQueryService {
    cache: Arc<CacheService>,
    users: QueryExecutor,
    conversions: QueryExecutor,
}

impl CachedQueryService {
    /// Create the facade over a cache, a shared monitor, and a store
    /// adapter.
    pub fn new(
        cache: Arc<CacheService>,
        monitor: Arc<PerformanceMonitor>,
        adapter: Arc<dyn StoreAdapter>,
    ) -> Self {
        Self {
            cache,
            users: QueryExecutor::new(adapter.clone(), monitor.clone(), USERS_TABLE),
            conversions: QueryExecutor::new(adapter, monitor, CONVERSIONS_TABLE),
        }
    }

    fn user_tag(user_id: Uuid) -> String {
        format!("user:{}", user_id)
    }

    /// Aggregated conversion statistics for `user_id`, cached under
    /// `user-analytics:<id>`.
    pub async fn user_analytics(&self, user_id: Uuid) -> StrataResult<UserAnalytics> {
        let key = format!("user-analytics:{}", user_id);
        self.cache
            .get(
                &key,
                || async move {
                    let payload = self
                        .conversions
                        .rpc(STATS_RPC, json!({ "user_id": user_id.to_string() }))
                        .await?;
                    serde_json::from_value(payload).map_err(|e| {
                        StoreError::RpcFailed {
                            name: STATS_RPC.to_string(),
                            reason: format!("malformed stats payload: {}", e),
                        }
                        .into()
                    })
                },
                CacheOptions::new()
                    .with_ttl(ANALYTICS_TTL)
                    .with_tag(Self::user_tag(user_id))
                    .with_tag("analytics"),
            )
            .await
    }

    /// The user's profile row, cached under `user-profile:<id>`.
    pub async fn user_profile(&self, user_id: Uuid) -> StrataResult<Option<UserProfile>> {
        let key = format!("user-profile:{}", user_id);
        self.cache
            .get(
                &key,
                || async move {
                    let row = self.users.find_by_id(json!(user_id.to_string())).await?;
                    match row {
                        Some(row) => decode_row(USERS_TABLE, row).map(Some),
                        None => Ok(None),
                    }
                },
                CacheOptions::new()
                    .with_ttl(PROFILE_TTL)
                    .with_tag(Self::user_tag(user_id))
                    .with_tag("profiles"),
            )
            .await
    }

    /// Keyset page over the user's conversions, newest first.
    ///
    /// Only the first page (no cursor) is cached; continuation pages read
    /// through to the store, since each cursor value would make a
    /// single-use cache entry.
    pub async fn recent_conversions(
        &self,
        user_id: Uuid,
        limit: usize,
        cursor: Option<serde_json::Value>,
    ) -> StrataResult<CursorPage<ConversionRecord>> {
        let options = CursorOptions::desc("created_at", limit)
            .with_filter(FilterExpr::eq("user_id", json!(user_id.to_string())));

        match cursor {
            Some(cursor) => {
                let page = self
                    .conversions
                    .find_with_cursor(options.with_cursor(cursor))
                    .await?;
                decode_page(page)
            }
            None => {
                let key = format!("recent-conversions:{}:{}", user_id, limit);
                self.cache
                    .get(
                        &key,
                        || async move {
                            let page = self.conversions.find_with_cursor(options).await?;
                            decode_page(page)
                        },
                        CacheOptions::new()
                            .with_ttl(RECENT_TTL)
                            .with_tag(Self::user_tag(user_id))
                            .with_tag("conversions"),
                    )
                    .await
            }
        }
    }

    /// Write a batch of conversion records, then evict every cached
    /// artifact of the affected users so the next read recomputes.
    pub async fn import_conversions(&self, records: &[ConversionRecord]) -> StrataResult<u64> {
        let rows: Vec<Row> = records
            .iter()
            .map(|record| {
                serde_json::to_value(record).map_err(|e| {
                    StoreError::InsertFailed {
                        table: CONVERSIONS_TABLE.to_string(),
                        reason: format!("unserializable record: {}", e),
                    }
                    .into()
                })
            })
            .collect::<StrataResult<_>>()?;

        let written = self.conversions.batch_insert(&rows).await?;

        let mut tags: Vec<String> = records
            .iter()
            .map(|record| Self::user_tag(record.user_id))
            .collect();
        tags.sort();
        tags.dedup();
        let evicted = self.cache.invalidate_by_tags(&tags).await;
        debug!(written, evicted, "imported conversions and evicted stale entries");

        Ok(written)
    }

    /// Evict every cached artifact for `user_id` in one call.
    pub async fn invalidate_user_cache(&self, user_id: Uuid) -> usize {
        self.cache
            .invalidate_by_tags(&[Self::user_tag(user_id)])
            .await
    }

    /// Underlying cache statistics, for observability.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.get_stats().await
    }
}

fn decode_row<T: serde::de::DeserializeOwned>(table: &str, row: Row) -> StrataResult<T> {
    serde_json::from_value(row).map_err(|e| {
        StoreError::QueryFailed {
            table: table.to_string(),
            reason: format!("malformed row: {}", e),
        }
        .into()
    })
}

fn decode_page(page: CursorPage<Row>) -> StrataResult<CursorPage<ConversionRecord>> {
    let next_cursor = page.next_cursor.clone();
    let has_more = page.has_more;
    let items = page
        .items
        .into_iter()
        .map(|row| decode_row(CONVERSIONS_TABLE, row))
        .collect::<StrataResult<Vec<_>>>()?;
    Ok(CursorPage {
        items,
        next_cursor,
        has_more,
    })
}

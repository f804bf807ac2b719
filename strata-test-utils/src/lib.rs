//! Strata Test Utilities
//!
//! Centralized test infrastructure for the Strata workspace:
//! - Seeded in-memory store fixtures (users, conversions, stats RPC)
//! - A failure-injecting adapter wrapper for probe and warm-up tests
//! - Proptest generators for store rows

// Re-export the in-memory adapter from its source crate
pub use strata_query::MemoryStoreAdapter;

// Re-export core types for convenience
pub use strata_core::{
    CursorPage, FilterExpr, FilterOperator, OrderBy, OrderDirection, Row, StoreError,
    StrataError, StrataResult,
};

// Re-export the cache surface so service tests need one import
pub use strata_cache::{CacheConfig, CacheOptions, CacheService, CacheStats};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use strata_query::{SelectQuery, StoreAdapter};

// ============================================================================
// FIXED FIXTURES
// ============================================================================

/// Number of conversions seeded for the sample user.
pub const SEEDED_CONVERSIONS: u64 = 3;

const SAMPLE_USER: &str = "0190c3a4-0000-7000-8000-000000000001";
const OTHER_USER: &str = "0190c3a4-0000-7000-8000-000000000002";

/// The user every seeded fixture revolves around.
pub fn sample_user_id() -> Uuid {
    Uuid::parse_str(SAMPLE_USER).expect("valid fixture uuid")
}

/// A second user with no seeded conversions.
pub fn other_user_id() -> Uuid {
    Uuid::parse_str(OTHER_USER).expect("valid fixture uuid")
}

/// A `users` table row.
pub fn user_row(id: Uuid, email: &str, plan: &str) -> Row {
    json!({
        "id": id.to_string(),
        "email": email,
        "display_name": "Sample User",
        "plan": plan,
        "created_at": "2025-01-15T09:00:00Z",
    })
}

/// A `conversions` table row.
pub fn conversion_row(
    id: Uuid,
    user_id: Uuid,
    status: &str,
    size_bytes: i64,
    created_at: &str,
) -> Row {
    json!({
        "id": id.to_string(),
        "user_id": user_id.to_string(),
        "source_format": "docx",
        "target_format": "pdf",
        "status": status,
        "size_bytes": size_bytes,
        "created_at": created_at,
    })
}

// ============================================================================
// SEEDED STORE
// ============================================================================

/// A seeded in-memory store plus observability for its stats RPC.
pub struct SeededStore {
    /// The adapter, seeded with one user and three conversions.
    pub adapter: Arc<MemoryStoreAdapter>,
    rpc_calls: Arc<AtomicU64>,
}

impl SeededStore {
    /// How many times the `user_conversion_stats` RPC has run.
    pub fn rpc_calls(&self) -> u64 {
        self.rpc_calls.load(Ordering::SeqCst)
    }
}

/// Build a store seeded with the sample user, three conversions, and a
/// `user_conversion_stats` handler computed over the seeded rows.
pub async fn seeded_store() -> SeededStore {
    let adapter = Arc::new(MemoryStoreAdapter::new());

    adapter
        .insert(
            "users",
            &[user_row(sample_user_id(), "sample@example.com", "pro")],
        )
        .await
        .expect("seed users");

    let seed = [
        ("completed", 2_048, "2025-06-01T00:00:00Z"),
        ("completed", 4_096, "2025-06-02T00:00:00Z"),
        ("failed", 1_024, "2025-06-03T00:00:00Z"),
    ];
    let conversions: Vec<Row> = seed
        .iter()
        .map(|(status, size, created_at)| {
            conversion_row(Uuid::now_v7(), sample_user_id(), status, *size, created_at)
        })
        .collect();
    adapter
        .insert("conversions", &conversions)
        .await
        .expect("seed conversions");

    let rpc_calls = Arc::new(AtomicU64::new(0));
    let calls = rpc_calls.clone();
    adapter
        .register_rpc("user_conversion_stats", move |params| {
            calls.fetch_add(1, Ordering::SeqCst);
            let user_id = params
                .get("user_id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| StoreError::RpcFailed {
                    name: "user_conversion_stats".to_string(),
                    reason: "missing user_id param".to_string(),
                })?;

            if user_id == SAMPLE_USER {
                Ok(json!({
                    "user_id": user_id,
                    "total_conversions": 3,
                    "completed": 2,
                    "failed": 1,
                    "total_bytes_processed": 7_168,
                }))
            } else {
                Ok(json!({
                    "user_id": user_id,
                    "total_conversions": 0,
                    "completed": 0,
                    "failed": 0,
                    "total_bytes_processed": 0,
                }))
            }
        })
        .await;

    SeededStore { adapter, rpc_calls }
}

// ============================================================================
// FAILURE INJECTION
// ============================================================================

/// Adapter wrapper that fails every operation while the flag is set.
///
/// Used to exercise probe classification, warm-up absorption, and error
/// propagation without a real unreachable store.
pub struct FlakyStoreAdapter {
    inner: Arc<dyn StoreAdapter>,
    failing: AtomicBool,
}

impl FlakyStoreAdapter {
    /// Wrap an adapter; starts healthy.
    pub fn new(inner: Arc<dyn StoreAdapter>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    /// Toggle failure injection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StrataResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::ConnectionFailed {
                reason: "injected failure".to_string(),
            }
            .into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreAdapter for FlakyStoreAdapter {
    async fn select(&self, table: &str, query: &SelectQuery) -> StrataResult<Vec<Row>> {
        self.check()?;
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> StrataResult<u64> {
        self.check()?;
        self.inner.insert(table, rows).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[FilterExpr],
        patch: &Row,
    ) -> StrataResult<u64> {
        self.check()?;
        self.inner.update(table, filters, patch).await
    }

    async fn delete(&self, table: &str, filters: &[FilterExpr]) -> StrataResult<u64> {
        self.check()?;
        self.inner.delete(table, filters).await
    }

    async fn rpc(&self, name: &str, params: serde_json::Value) -> StrataResult<serde_json::Value> {
        self.check()?;
        self.inner.rpc(name, params).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod strategies {
    //! Proptest strategies for store rows.

    use super::*;
    use proptest::prelude::*;

    /// Strategy for conversion statuses, weighted toward completion.
    pub fn conversion_status() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => Just("completed".to_string()),
            1 => Just("failed".to_string()),
            1 => Just("pending".to_string()),
        ]
    }

    /// Strategy for a set of conversion rows for one user with distinct,
    /// sortable `created_at` values.
    pub fn conversion_rows(user_id: Uuid) -> impl Strategy<Value = Vec<Row>> {
        proptest::collection::vec((conversion_status(), 1i64..10_000_000), 1..40).prop_map(
            move |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (status, size))| {
                        // Day offsets keep timestamps distinct and ordered.
                        let created_at = format!("2025-03-{:02}T{:02}:00:00Z", 1 + i / 24, i % 24);
                        conversion_row(Uuid::now_v7(), user_id, &status, size, &created_at)
                    })
                    .collect()
            },
        )
    }
}

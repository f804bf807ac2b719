//! In-memory store adapter
//!
//! HashMap-backed tables plus registrable RPC handlers. Used by the test
//! suites and as the reference semantics for filter evaluation: adapters
//! against real stores are expected to match what this one does with the
//! same query.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use strata_core::{FilterExpr, FilterOperator, OrderDirection, Row, StoreError, StrataResult};

use crate::store::{validate_identifier, SelectQuery, StoreAdapter};

/// Server-side function stand-in for tests.
pub type RpcHandler =
    Box<dyn Fn(serde_json::Value) -> StrataResult<serde_json::Value> + Send + Sync>;

/// In-memory tables with JSON rows.
///
/// Tables are created implicitly on first insert; selecting from an
/// unknown table yields no rows, matching a schemaless fake rather than a
/// real store's catalog errors.
#[derive(Default)]
pub struct MemoryStoreAdapter {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    rpc_handlers: RwLock<HashMap<String, RpcHandler>>,
}

impl MemoryStoreAdapter {
    /// Create an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler invoked by `rpc(name, ..)`.
    pub async fn register_rpc<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(serde_json::Value) -> StrataResult<serde_json::Value> + Send + Sync + 'static,
    {
        self.rpc_handlers
            .write()
            .await
            .insert(name.into(), Box::new(handler));
    }

    /// Number of rows currently in `table`.
    pub async fn table_len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Total order over the comparable JSON scalar pairs; `None` for
/// mismatched or non-scalar types.
fn compare_values(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    use serde_json::Value::*;
    match (a, b) {
        (Null, Null) => Some(Ordering::Equal),
        (Bool(x), Bool(y)) => Some(x.cmp(y)),
        (Number(x), Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (String(x), String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn field_of<'a>(row: &'a Row, field: &str) -> &'a serde_json::Value {
    row.get(field).unwrap_or(&serde_json::Value::Null)
}

fn matches(row: &Row, filter: &FilterExpr) -> bool {
    let field = field_of(row, &filter.field);
    let cmp = compare_values(field, &filter.value);
    match filter.operator {
        FilterOperator::Eq => cmp == Some(Ordering::Equal),
        FilterOperator::Ne => cmp != Some(Ordering::Equal),
        FilterOperator::Gt => cmp == Some(Ordering::Greater),
        FilterOperator::Lt => cmp == Some(Ordering::Less),
        FilterOperator::Gte => matches!(cmp, Some(Ordering::Greater | Ordering::Equal)),
        FilterOperator::Lte => matches!(cmp, Some(Ordering::Less | Ordering::Equal)),
        FilterOperator::Contains => match (field.as_str(), filter.value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        FilterOperator::In => filter
            .value
            .as_array()
            .is_some_and(|candidates| {
                candidates
                    .iter()
                    .any(|v| compare_values(field, v) == Some(Ordering::Equal))
            }),
    }
}

fn matches_all(row: &Row, filters: &[FilterExpr]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

#[async_trait]
impl StoreAdapter for MemoryStoreAdapter {
    async fn select(&self, table: &str, query: &SelectQuery) -> StrataResult<Vec<Row>> {
        validate_identifier(table)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(field_of(a, &order.column), field_of(b, &order.column))
                    .unwrap_or(Ordering::Equal);
                match order.direction {
                    OrderDirection::Ascending => ordering,
                    OrderDirection::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> StrataResult<u64> {
        validate_identifier(table)?;
        for row in rows {
            if !row.is_object() {
                return Err(StoreError::InsertFailed {
                    table: table.to_string(),
                    reason: "row is not a JSON object".to_string(),
                }
                .into());
            }
        }
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[FilterExpr],
        patch: &Row,
    ) -> StrataResult<u64> {
        validate_identifier(table)?;
        let patch = patch.as_object().ok_or_else(|| StoreError::UpdateFailed {
            table: table.to_string(),
            reason: "patch is not a JSON object".to_string(),
        })?;

        let mut tables = self.tables.write().await;
        let mut changed = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if matches_all(row, filters) {
                    if let Some(object) = row.as_object_mut() {
                        for (key, value) in patch {
                            object.insert(key.clone(), value.clone());
                        }
                        changed += 1;
                    }
                }
            }
        }
        Ok(changed)
    }

    async fn delete(&self, table: &str, filters: &[FilterExpr]) -> StrataResult<u64> {
        validate_identifier(table)?;
        let mut tables = self.tables.write().await;
        let mut removed = 0;
        if let Some(rows) = tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|row| !matches_all(row, filters));
            removed = (before - rows.len()) as u64;
        }
        Ok(removed)
    }

    async fn rpc(&self, name: &str, params: serde_json::Value) -> StrataResult<serde_json::Value> {
        validate_identifier(name)?;
        let handlers = self.rpc_handlers.read().await;
        let handler = handlers.get(name).ok_or_else(|| StoreError::RpcFailed {
            name: name.to_string(),
            reason: "no handler registered".to_string(),
        })?;
        handler(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::OrderBy;

    async fn seeded() -> MemoryStoreAdapter {
        let adapter = MemoryStoreAdapter::new();
        adapter
            .insert(
                "conversions",
                &[
                    json!({"id": "c1", "user_id": "u1", "status": "completed", "created_at": "2025-06-01T00:00:00Z"}),
                    json!({"id": "c2", "user_id": "u1", "status": "failed", "created_at": "2025-06-02T00:00:00Z"}),
                    json!({"id": "c3", "user_id": "u2", "status": "completed", "created_at": "2025-06-03T00:00:00Z"}),
                ],
            )
            .await
            .unwrap();
        adapter
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_limits() {
        let adapter = seeded().await;
        let query = SelectQuery::new()
            .with_filter(FilterExpr::eq("user_id", json!("u1")))
            .with_order(OrderBy::desc("created_at"))
            .with_limit(1);

        let rows = adapter.select("conversions", &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("c2"));
    }

    #[tokio::test]
    async fn test_select_unknown_table_is_empty() {
        let adapter = MemoryStoreAdapter::new();
        let rows = adapter
            .select("nothing_here", &SelectQuery::new())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_in_and_contains_operators() {
        let adapter = seeded().await;

        let query = SelectQuery::new().with_filter(FilterExpr::new(
            "status",
            FilterOperator::In,
            json!(["failed", "pending"]),
        ));
        let rows = adapter.select("conversions", &query).await.unwrap();
        assert_eq!(rows.len(), 1);

        let query = SelectQuery::new().with_filter(FilterExpr::new(
            "status",
            FilterOperator::Contains,
            json!("complete"),
        ));
        let rows = adapter.select("conversions", &query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let adapter = seeded().await;
        let changed = adapter
            .update(
                "conversions",
                &[FilterExpr::eq("id", json!("c1"))],
                &json!({"status": "archived"}),
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let rows = adapter
            .select(
                "conversions",
                &SelectQuery::new().with_filter(FilterExpr::eq("id", json!("c1"))),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["status"], json!("archived"));
        assert_eq!(rows[0]["user_id"], json!("u1"));
    }

    #[tokio::test]
    async fn test_delete_counts_removed_rows() {
        let adapter = seeded().await;
        let removed = adapter
            .delete("conversions", &[FilterExpr::eq("user_id", json!("u1"))])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(adapter.table_len("conversions").await, 1);
    }

    #[tokio::test]
    async fn test_rpc_dispatches_to_handler() {
        let adapter = MemoryStoreAdapter::new();
        adapter
            .register_rpc("echo", |params| Ok(json!({"echo": params})))
            .await;

        let result = adapter.rpc("echo", json!(42)).await.unwrap();
        assert_eq!(result, json!({"echo": 42}));

        let err = adapter.rpc("missing", json!(null)).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_insert_rejects_non_object_rows() {
        let adapter = MemoryStoreAdapter::new();
        let err = adapter.insert("t", &[json!([1, 2, 3])]).await;
        assert!(err.is_err());
    }
}

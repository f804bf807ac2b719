//! Query executor
//!
//! Builds cursor-paginated reads and chunked batch writes against a store
//! adapter for one logical table. Every call is routed through the shared
//! performance monitor under a `<table>.<operation>` name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use strata_core::{
    CursorPage, FilterExpr, OrderBy, OrderDirection, Row, StoreError, StrataResult,
};

use crate::monitor::PerformanceMonitor;
use crate::store::{SelectQuery, StoreAdapter};

/// Configuration for the query executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Batch inserts above this size are split into sequential chunks to
    /// bound request size and partial-failure blast radius. Set it at or
    /// above the largest batch you issue to insert in one call.
    pub max_batch_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 500,
        }
    }
}

impl ExecutorConfig {
    /// Create an executor config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the max batch size.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Create ExecutorConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STRATA_MAX_BATCH_SIZE`: insert chunk size (default: 500)
    pub fn from_env() -> Self {
        let max_batch_size = std::env::var("STRATA_MAX_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(500);

        Self { max_batch_size }
    }
}

/// Options for one keyset-paginated read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorOptions {
    /// Conjunctive filters applied before pagination.
    pub filters: Vec<FilterExpr>,
    /// Page size; `has_more` is true exactly when a full page returns.
    pub limit: usize,
    /// Ordering column; its value on the last row becomes the next cursor.
    pub order_by: String,
    /// Sort direction; also fixes the cursor bound direction.
    pub direction: OrderDirection,
    /// Exclusive bound from the previous page, if continuing.
    pub cursor: Option<serde_json::Value>,
}

impl CursorOptions {
    /// Page descending by `order_by` (newest-first reads).
    pub fn desc(order_by: impl Into<String>, limit: usize) -> Self {
        Self {
            filters: Vec::new(),
            limit,
            order_by: order_by.into(),
            direction: OrderDirection::Descending,
            cursor: None,
        }
    }

    /// Page ascending by `order_by`.
    pub fn asc(order_by: impl Into<String>, limit: usize) -> Self {
        Self {
            filters: Vec::new(),
            limit,
            order_by: order_by.into(),
            direction: OrderDirection::Ascending,
            cursor: None,
        }
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Continue from a previous page's `next_cursor`.
    pub fn with_cursor(mut self, cursor: serde_json::Value) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// Monitored query builder over one logical table.
///
/// Pagination is keyset-based (offset-free): stable under insertions and
/// deletions elsewhere in the table, but a page boundary computed from a
/// stale cursor can skip or repeat rows relative to concurrent writes.
/// Backing-store errors surface unmodified; there are no internal retries.
pub struct QueryExecutor {
    adapter: Arc<dyn StoreAdapter>,
    monitor: Arc<PerformanceMonitor>,
    table: String,
    config: ExecutorConfig,
}

impl QueryExecutor {
    /// Create an executor for `table` with default configuration.
    pub fn new(
        adapter: Arc<dyn StoreAdapter>,
        monitor: Arc<PerformanceMonitor>,
        table: impl Into<String>,
    ) -> Self {
        Self::with_config(adapter, monitor, table, ExecutorConfig::default())
    }

    /// Create an executor with an explicit configuration.
    pub fn with_config(
        adapter: Arc<dyn StoreAdapter>,
        monitor: Arc<PerformanceMonitor>,
        table: impl Into<String>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            adapter,
            monitor,
            table: table.into(),
            config,
        }
    }

    /// The table this executor reads and writes.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn op_name(&self, op: &str) -> String {
        format!("{}.{}", self.table, op)
    }

    /// Fetch a single row by its `id` column.
    pub async fn find_by_id(&self, id: serde_json::Value) -> StrataResult<Option<Row>> {
        self.monitor
            .track_query(&self.op_name("find_by_id"), || async move {
                let query = SelectQuery::new()
                    .with_filter(FilterExpr::eq("id", id))
                    .with_limit(1);
                let rows = self.adapter.select(&self.table, &query).await?;
                Ok(rows.into_iter().next())
            })
            .await
    }

    /// Fetch one page of a keyset-paginated read.
    ///
    /// `has_more` is true exactly when the page came back full;
    /// `next_cursor` is then the ordering-column value of the last row. A
    /// provided cursor becomes an exclusive bound on the ordering column
    /// (`<` descending, `>` ascending).
    pub async fn find_with_cursor(&self, options: CursorOptions) -> StrataResult<CursorPage<Row>> {
        self.monitor
            .track_query(&self.op_name("find_with_cursor"), || async move {
                if options.limit == 0 {
                    return Ok(CursorPage::empty());
                }

                let mut filters = options.filters.clone();
                if let Some(cursor) = &options.cursor {
                    filters.push(FilterExpr::new(
                        options.order_by.clone(),
                        options.direction.cursor_operator(),
                        cursor.clone(),
                    ));
                }

                let query = SelectQuery {
                    filters,
                    order: Some(OrderBy {
                        column: options.order_by.clone(),
                        direction: options.direction,
                    }),
                    limit: Some(options.limit),
                };

                let rows = self.adapter.select(&self.table, &query).await?;
                let has_more = rows.len() == options.limit;
                let next_cursor = if has_more {
                    let last = rows.last().and_then(|row| row.get(&options.order_by));
                    match last {
                        Some(value) => Some(value.clone()),
                        None => {
                            return Err(StoreError::InvalidCursor {
                                column: options.order_by.clone(),
                            }
                            .into())
                        }
                    }
                } else {
                    None
                };

                Ok(CursorPage {
                    items: rows,
                    next_cursor,
                    has_more,
                })
            })
            .await
    }

    /// Insert all rows, chunking above the configured batch size.
    ///
    /// Chunks are written sequentially in input order. On a chunk failure
    /// the error carries the number of rows committed before it; committed
    /// chunks are not rolled back.
    pub async fn batch_insert(&self, rows: &[Row]) -> StrataResult<u64> {
        self.monitor
            .track_query(&self.op_name("batch_insert"), || async move {
                let mut committed: u64 = 0;
                for chunk in rows.chunks(self.config.max_batch_size.max(1)) {
                    match self.adapter.insert(&self.table, chunk).await {
                        Ok(count) => committed += count,
                        Err(err) => {
                            return Err(StoreError::BatchFailed {
                                table: self.table.clone(),
                                committed,
                                reason: err.to_string(),
                            }
                            .into())
                        }
                    }
                }
                Ok(committed)
            })
            .await
    }

    /// Update rows matching `filters` with the columns in `patch`.
    pub async fn update_where(
        &self,
        filters: &[FilterExpr],
        patch: &Row,
    ) -> StrataResult<u64> {
        self.monitor
            .track_query(&self.op_name("update"), || async move {
                self.adapter.update(&self.table, filters, patch).await
            })
            .await
    }

    /// Delete rows matching `filters`.
    pub async fn delete_where(&self, filters: &[FilterExpr]) -> StrataResult<u64> {
        self.monitor
            .track_query(&self.op_name("delete"), || async move {
                self.adapter.delete(&self.table, filters).await
            })
            .await
    }

    /// Invoke a server-side function, monitored under `rpc.<name>`.
    pub async fn rpc(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> StrataResult<serde_json::Value> {
        self.monitor
            .track_query(&format!("rpc.{}", name), || async move {
                self.adapter.rpc(name, params).await
            })
            .await
    }
}

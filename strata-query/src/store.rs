//! Store adapter trait
//!
//! Explicit interface over the operations this layer actually uses
//! against a remote relational store, so the layer is store-agnostic and
//! testable with an in-memory fake. Implementations surface their errors
//! unmodified; retries and timeouts belong to the adapter or its caller,
//! never to this trait's consumers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use strata_core::{FilterExpr, OrderBy, Row, StoreError, StrataResult};

/// A filtered, ordered, limited read against one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Conjunctive filters (all must match).
    pub filters: Vec<FilterExpr>,
    /// Ordering clause, if any.
    pub order: Option<OrderBy>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// An unfiltered, unordered, unlimited query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the ordering clause.
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Backing-store adapter over named tables.
///
/// Rows travel as JSON objects in both directions. Table and function
/// names are validated as identifiers before use.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Read rows matching the query.
    async fn select(&self, table: &str, query: &SelectQuery) -> StrataResult<Vec<Row>>;

    /// Insert the given rows. Returns the number of rows written.
    async fn insert(&self, table: &str, rows: &[Row]) -> StrataResult<u64>;

    /// Apply `patch` (an object of column -> new value) to every row
    /// matching `filters`. Returns the number of rows changed.
    async fn update(&self, table: &str, filters: &[FilterExpr], patch: &Row)
        -> StrataResult<u64>;

    /// Delete every row matching `filters`. Returns the number removed.
    async fn delete(&self, table: &str, filters: &[FilterExpr]) -> StrataResult<u64>;

    /// Invoke a named server-side function with JSON params.
    async fn rpc(&self, name: &str, params: serde_json::Value) -> StrataResult<serde_json::Value>;
}

/// Validate a table/function/column identifier.
///
/// Identifiers are interpolated into query text by the adapters, so only
/// ASCII alphanumerics and underscores are allowed, and the first
/// character must not be a digit.
pub fn validate_identifier(name: &str) -> StrataResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier {
            name: name.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::OrderBy;

    #[test]
    fn test_select_query_builder() {
        let query = SelectQuery::new()
            .with_filter(FilterExpr::eq("user_id", json!("u1")))
            .with_order(OrderBy::desc("created_at"))
            .with_limit(10);

        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.order.as_ref().map(|o| o.column.as_str()), Some("created_at"));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("conversions").is_ok());
        assert!(validate_identifier("user_conversion_stats").is_ok());
        assert!(validate_identifier("t2").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("users; drop table users").is_err());
        assert!(validate_identifier("a-b").is_err());
    }
}

//! Filter expressions and ordering for store queries
//!
//! This module provides the filter types shared by every store adapter.
//! Adapters translate them into their native query form (SQL predicates,
//! in-memory row scans); the executor composes them for keyset pagination.

use serde::{Deserialize, Serialize};

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// Contains substring (for strings)
    Contains,
    /// In list of values
    In,
}

/// A single filter expression applied to a row field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against (JSON value for flexibility)
    pub value: serde_json::Value,
}

impl FilterExpr {
    /// Create a new filter expression.
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(field, FilterOperator::Gt, value)
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(field, FilterOperator::Lt, value)
    }
}

/// Sort direction for ordered reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    /// The exclusive-bound operator a cursor at this direction implies:
    /// descending pages continue below the cursor, ascending above it.
    pub fn cursor_operator(&self) -> FilterOperator {
        match self {
            OrderDirection::Ascending => FilterOperator::Gt,
            OrderDirection::Descending => FilterOperator::Lt,
        }
    }
}

/// Ordering clause for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Column to order by
    pub column: String,
    /// Sort direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Order ascending by the given column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Order descending by the given column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_constructors() {
        let f = FilterExpr::eq("user_id", json!("abc"));
        assert_eq!(f.operator, FilterOperator::Eq);
        assert_eq!(f.field, "user_id");

        let f = FilterExpr::lt("created_at", json!("2025-01-01T00:00:00Z"));
        assert_eq!(f.operator, FilterOperator::Lt);
    }

    #[test]
    fn test_cursor_operator_follows_direction() {
        assert_eq!(
            OrderDirection::Descending.cursor_operator(),
            FilterOperator::Lt
        );
        assert_eq!(
            OrderDirection::Ascending.cursor_operator(),
            FilterOperator::Gt
        );
    }
}

//! Strata Core - Shared Data Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains the error taxonomy, filter expressions, pagination
//! and metric types, and health classification - no business logic.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod error;
pub mod filter;
pub mod health;
pub mod metric;
pub mod page;

pub use error::{CacheError, ConfigError, StoreError, StrataError, StrataResult};
pub use filter::{FilterExpr, FilterOperator, OrderBy, OrderDirection};
pub use health::{ConnectionStatus, DatabaseHealth};
pub use metric::QueryMetric;
pub use page::CursorPage;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A single row from the backing store, represented as a JSON object.
///
/// Rows travel untyped through the adapter boundary; callers recover typed
/// views with `serde_json::from_value`.
pub type Row = serde_json::Value;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

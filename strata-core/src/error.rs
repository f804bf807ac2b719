//! Error types for Strata operations

use thiserror::Error;

/// Backing-store errors.
///
/// Raised by store adapters on any CRUD/RPC call and propagated unchanged
/// through the executor and the service façade. This layer performs no
/// retries; callers own backoff policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection to backing store failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Query on {table} failed: {reason}")]
    QueryFailed { table: String, reason: String },

    #[error("Insert into {table} failed: {reason}")]
    InsertFailed { table: String, reason: String },

    #[error("Update on {table} failed: {reason}")]
    UpdateFailed { table: String, reason: String },

    #[error("Delete on {table} failed: {reason}")]
    DeleteFailed { table: String, reason: String },

    #[error("RPC {name} failed: {reason}")]
    RpcFailed { name: String, reason: String },

    #[error("Batch insert into {table} failed after {committed} rows: {reason}")]
    BatchFailed {
        table: String,
        committed: u64,
        reason: String,
    },

    #[error("Invalid identifier: {name}")]
    InvalidIdentifier { name: String },

    #[error("Cursor column {column} missing from returned row")]
    InvalidCursor { column: String },
}

/// Cache layer errors.
///
/// Caller-supplied computation failures are NOT represented here - they
/// propagate as whatever error the computation produced and are never
/// cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to serialize value for key {key}: {reason}")]
    SerializeFailed { key: String, reason: String },

    #[error("Failed to deserialize cached value for key {key}: {reason}")]
    DeserializeFailed { key: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Strata errors.
#[derive(Debug, Clone, Error)]
pub enum StrataError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Strata operations.
pub type StrataResult<T> = Result<T, StrataError>;

// =============================================================================
// TESTS
// =============================================================================

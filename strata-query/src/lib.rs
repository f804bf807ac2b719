//! Strata Query - The Backing-Store Boundary
//!
//! Defines the store adapter abstraction (select/insert/update/delete/rpc
//! over named tables), an in-memory implementation for tests, a PostgreSQL
//! implementation, the performance monitor that wraps every tracked call,
//! and the query executor that builds keyset-paginated reads and chunked
//! batch writes on top of an adapter.
//!
//! No operation here retries or suppresses errors; adapter failures
//! surface unchanged to the caller.

pub mod executor;
pub mod memory;
pub mod monitor;
pub mod postgres;
pub mod store;

pub use executor::{CursorOptions, ExecutorConfig, QueryExecutor};
pub use memory::MemoryStoreAdapter;
pub use monitor::{MonitorConfig, PerformanceMonitor, PerformanceReport};
pub use postgres::{PgConfig, PgStoreAdapter};
pub use store::{SelectQuery, StoreAdapter};

//! Strata Cache - TTL and Tag-Based Caching
//!
//! Generic cache wrapping arbitrary asynchronous computations. Entries
//! carry a time-to-live and a set of tags; tag-based invalidation evicts
//! every entry sharing a label without knowing its key. Expiry is checked
//! lazily on read.
//!
//! State is process-local by contract: in a multi-instance deployment each
//! instance has its own view and invalidation only affects the local one.

pub mod config;
pub mod entry;
pub mod service;
pub mod stats;
pub mod tag_index;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use service::{CacheOptions, CacheService};
pub use stats::CacheStats;
pub use tag_index::TagIndex;

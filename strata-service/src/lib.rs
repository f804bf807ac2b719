//! Strata Service - Domain Facade and Optimization
//!
//! `CachedQueryService` combines the cache and the query executors into
//! domain-level reads with deterministic keys and entity-scoped tags, so a
//! single tag invalidation evicts every cached artifact for an entity.
//! `OptimizationService` aggregates cache statistics and the performance
//! monitor's reports into health alerts and actionable recommendations,
//! and drives best-effort cache warm-up.

pub mod cached;
pub mod optimize;
pub mod types;

pub use cached::CachedQueryService;
pub use optimize::{OptimizationService, OptimizerConfig};
pub use types::{
    Alert, AlertSeverity, CachePerformance, ConversionRecord, OptimizationReport,
    QueryPerformance, Recommendation, RecommendationSet, ThresholdReport, ThresholdStatus,
    UserAnalytics, UserProfile,
};

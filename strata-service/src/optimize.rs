//! Optimization service
//!
//! Aggregates the cache's statistics and the performance monitor's reports
//! into a merged optimization report, rule-based recommendations, and
//! threshold alerts. Also drives cache warm-up: best-effort, failures are
//! logged and absorbed.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use strata_cache::{CacheService, CacheStats};
use strata_core::DatabaseHealth;
use strata_query::{PerformanceMonitor, PerformanceReport, SelectQuery, StoreAdapter};

use crate::cached::CachedQueryService;
use crate::types::{
    Alert, CachePerformance, OptimizationReport, QueryPerformance, Recommendation,
    RecommendationSet, ThresholdReport,
};

/// Table probed for connectivity; any cheap read works.
const PROBE_TABLE: &str = "users";
/// Page size used when warming the recent-conversions cache.
const WARM_PAGE_SIZE: usize = 10;

/// Thresholds for recommendations and alerts.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Average execution time above this fires a performance
    /// recommendation; above twice this, a critical alert.
    pub latency_threshold_ms: f64,
    /// Hit rates below this floor fire a caching recommendation.
    pub hit_rate_floor: f64,
    /// Query names seen more often than this fire an indexing
    /// recommendation.
    pub frequency_threshold: u64,
    /// Minimum lookups before the hit rate is considered meaningful.
    pub min_cache_samples: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            latency_threshold_ms: 500.0,
            hit_rate_floor: 0.5,
            frequency_threshold: 100,
            min_cache_samples: 20,
        }
    }
}

impl OptimizerConfig {
    /// Create an optimizer config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latency threshold.
    pub fn with_latency_threshold_ms(mut self, threshold: f64) -> Self {
        self.latency_threshold_ms = threshold;
        self
    }

    /// Set the hit-rate floor.
    pub fn with_hit_rate_floor(mut self, floor: f64) -> Self {
        self.hit_rate_floor = floor;
        self
    }

    /// Set the frequency threshold.
    pub fn with_frequency_threshold(mut self, threshold: u64) -> Self {
        self.frequency_threshold = threshold;
        self
    }

    /// Set the minimum cache sample size.
    pub fn with_min_cache_samples(mut self, min: u64) -> Self {
        self.min_cache_samples = min;
        self
    }

    /// Create OptimizerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STRATA_LATENCY_THRESHOLD_MS` (default: 500)
    /// - `STRATA_HIT_RATE_FLOOR` (default: 0.5)
    /// - `STRATA_FREQUENCY_THRESHOLD` (default: 100)
    /// - `STRATA_MIN_CACHE_SAMPLES` (default: 20)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            latency_threshold_ms: std::env::var("STRATA_LATENCY_THRESHOLD_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.latency_threshold_ms),
            hit_rate_floor: std::env::var("STRATA_HIT_RATE_FLOOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.hit_rate_floor),
            frequency_threshold: std::env::var("STRATA_FREQUENCY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frequency_threshold),
            min_cache_samples: std::env::var("STRATA_MIN_CACHE_SAMPLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_cache_samples),
        }
    }
}

/// Health reporting and cache warm-up over the collected statistics.
pub struct OptimizationService {
    cache: Arc<CacheService>,
    monitor: Arc<PerformanceMonitor>,
    adapter: Arc<dyn StoreAdapter>,
    facade: Arc<CachedQueryService>,
    config: OptimizerConfig,
}

impl OptimizationService {
    /// Create the service with default thresholds.
    pub fn new(
        cache: Arc<CacheService>,
        monitor: Arc<PerformanceMonitor>,
        adapter: Arc<dyn StoreAdapter>,
        facade: Arc<CachedQueryService>,
    ) -> Self {
        Self::with_config(cache, monitor, adapter, facade, OptimizerConfig::default())
    }

    /// Create the service with explicit thresholds.
    pub fn with_config(
        cache: Arc<CacheService>,
        monitor: Arc<PerformanceMonitor>,
        adapter: Arc<dyn StoreAdapter>,
        facade: Arc<CachedQueryService>,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            cache,
            monitor,
            adapter,
            facade,
            config,
        }
    }

    /// Get the optimizer configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The facade whose queries warm-up drives.
    pub fn facade(&self) -> &CachedQueryService {
        &self.facade
    }

    /// Round-trip a cheap read to classify store connectivity.
    pub async fn probe_database(&self) -> DatabaseHealth {
        let started = Instant::now();
        match self
            .adapter
            .select(PROBE_TABLE, &SelectQuery::new().with_limit(1))
            .await
        {
            Ok(_) => DatabaseHealth::connected(started.elapsed().as_millis() as i64),
            Err(e) => {
                warn!(error = %e, "database connectivity probe failed");
                DatabaseHealth::disconnected(e.to_string())
            }
        }
    }

    /// Merge monitor report, cache stats, and a connectivity probe into
    /// one report. Recomputed on every call.
    pub async fn optimization_metrics(&self) -> OptimizationReport {
        let performance = self.monitor.performance_report().await;
        let stats = self.cache.get_stats().await;
        let database_health = self.probe_database().await;
        let recommendations = self.recommendations_from(&performance, &stats);

        OptimizationReport {
            query_performance: QueryPerformance {
                average_execution_time_ms: performance.average_execution_time_ms,
                total_queries: performance.total_queries,
                slow_queries: performance.slow_queries.len() as u64,
            },
            cache_performance: CachePerformance {
                hit_rate: stats.hit_rate(),
                hits: stats.hits,
                misses: stats.misses,
            },
            database_health,
            recommendations,
        }
    }

    /// Rule-based suggestions over the current statistics.
    pub async fn optimization_recommendations(&self) -> RecommendationSet {
        let performance = self.monitor.performance_report().await;
        let stats = self.cache.get_stats().await;
        self.recommendations_from(&performance, &stats)
    }

    fn recommendations_from(
        &self,
        performance: &PerformanceReport,
        stats: &CacheStats,
    ) -> RecommendationSet {
        let mut set = RecommendationSet::default();

        if performance.total_queries > 0
            && performance.average_execution_time_ms > self.config.latency_threshold_ms
        {
            set.performance.push(Recommendation::general(format!(
                "average query time {:.0}ms exceeds the {:.0}ms target; review the slowest queries",
                performance.average_execution_time_ms, self.config.latency_threshold_ms,
            )));
        }

        if stats.hits + stats.misses >= self.config.min_cache_samples
            && stats.hit_rate() < self.config.hit_rate_floor
        {
            set.caching.push(Recommendation::general(format!(
                "cache hit rate {:.0}% is below {:.0}%; consider longer TTLs or warming hot keys",
                stats.hit_rate() * 100.0,
                self.config.hit_rate_floor * 100.0,
            )));
        }

        let slow_names: Vec<&str> = performance
            .slow_queries
            .iter()
            .map(|m| m.name.as_str())
            .collect();

        let mut frequent: Vec<(&String, &u64)> = performance
            .query_frequency
            .iter()
            .filter(|(_, count)| **count > self.config.frequency_threshold)
            .collect();
        frequent.sort_by_key(|(name, _)| name.as_str());

        for (name, count) in frequent {
            set.indexing.push(Recommendation::for_query(
                name.clone(),
                format!(
                    "{} ran {} times; verify an index supports its access pattern",
                    name, count
                ),
            ));
            if slow_names.contains(&name.as_str()) {
                set.queries.push(Recommendation::for_query(
                    name.clone(),
                    format!("{} is both frequent and slow; restructure or precompute it", name),
                ));
            }
        }

        set
    }

    /// Evaluate alert thresholds and classify overall status.
    pub async fn check_performance_thresholds(&self) -> ThresholdReport {
        let performance = self.monitor.performance_report().await;
        let stats = self.cache.get_stats().await;
        let health = self.probe_database().await;

        let mut alerts = Vec::new();

        if health.connection_status != strata_core::ConnectionStatus::Connected {
            alerts.push(Alert::critical(format!(
                "backing store unreachable: {}",
                health.message.as_deref().unwrap_or("probe failed"),
            )));
        }

        if performance.total_queries > 0 {
            let average = performance.average_execution_time_ms;
            if average > self.config.latency_threshold_ms * 2.0 {
                alerts.push(Alert::critical(format!(
                    "average query time {:.0}ms is more than double the {:.0}ms target",
                    average, self.config.latency_threshold_ms,
                )));
            } else if average > self.config.latency_threshold_ms {
                alerts.push(Alert::warning(format!(
                    "average query time {:.0}ms exceeds the {:.0}ms target",
                    average, self.config.latency_threshold_ms,
                )));
            }
        }

        if !performance.slow_queries.is_empty() {
            alerts.push(Alert::warning(format!(
                "{} slow queries in the current window",
                performance.slow_queries.len(),
            )));
        }

        if stats.hits + stats.misses >= self.config.min_cache_samples
            && stats.hit_rate() < self.config.hit_rate_floor
        {
            alerts.push(Alert::warning(format!(
                "cache hit rate {:.0}% is below {:.0}%",
                stats.hit_rate() * 100.0,
                self.config.hit_rate_floor * 100.0,
            )));
        }

        ThresholdReport::from_alerts(alerts)
    }

    /// Warm the critical cached queries for `user_id` so the next real
    /// request hits.
    ///
    /// Best-effort by contract: failures are logged and absorbed, never
    /// raised. Returns the number of queries successfully warmed.
    pub async fn warm_up_user_caches(&self, user_id: Uuid) -> usize {
        let mut warmed = 0;

        match self.facade.user_analytics(user_id).await {
            Ok(_) => warmed += 1,
            Err(e) => warn!(%user_id, error = %e, "analytics warm-up failed"),
        }
        match self.facade.user_profile(user_id).await {
            Ok(_) => warmed += 1,
            Err(e) => warn!(%user_id, error = %e, "profile warm-up failed"),
        }
        match self
            .facade
            .recent_conversions(user_id, WARM_PAGE_SIZE, None)
            .await
        {
            Ok(_) => warmed += 1,
            Err(e) => warn!(%user_id, error = %e, "recent-conversions warm-up failed"),
        }

        info!(%user_id, warmed, "cache warm-up complete");
        warmed
    }
}

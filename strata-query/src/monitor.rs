//! Query performance monitor
//!
//! Wraps query execution, records duration and frequency, and classifies
//! slow queries for health reporting. Metrics are appended on success and
//! failure alike; the wrapped error is re-raised after the metric lands.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use strata_core::QueryMetric;

/// Configuration for the performance monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Executions above this duration are classified slow.
    pub slow_query_threshold_ms: u64,
    /// Maximum retained metrics; oldest are evicted first. Cumulative
    /// totals and per-name frequency survive eviction.
    pub max_metrics: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 1_000,
            max_metrics: 1_000,
        }
    }
}

impl MonitorConfig {
    /// Create a monitor config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slow-query threshold.
    pub fn with_slow_query_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.slow_query_threshold_ms = threshold_ms;
        self
    }

    /// Set the metric retention bound.
    pub fn with_max_metrics(mut self, max: usize) -> Self {
        self.max_metrics = max;
        self
    }

    /// Create MonitorConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STRATA_SLOW_QUERY_THRESHOLD_MS`: slow classification bound (default: 1000)
    /// - `STRATA_MAX_METRICS`: retained metric count (default: 1000)
    pub fn from_env() -> Self {
        let slow_query_threshold_ms = std::env::var("STRATA_SLOW_QUERY_THRESHOLD_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1_000);

        let max_metrics = std::env::var("STRATA_MAX_METRICS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1_000);

        Self {
            slow_query_threshold_ms,
            max_metrics,
        }
    }
}

/// Snapshot of monitor state for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// Cumulative tracked calls since construction or `clear_metrics`.
    pub total_queries: u64,
    /// Arithmetic mean over retained metrics, successes and failures alike.
    pub average_execution_time_ms: f64,
    /// Retained metrics above the slow threshold.
    pub slow_queries: Vec<QueryMetric>,
    /// Cumulative per-name call counts.
    pub query_frequency: HashMap<String, u64>,
}

#[derive(Debug, Default)]
struct MonitorInner {
    metrics: VecDeque<QueryMetric>,
    total_queries: u64,
    frequency: HashMap<String, u64>,
}

/// Wall-clock tracker for named query executions.
pub struct PerformanceMonitor {
    inner: RwLock<MonitorInner>,
    config: MonitorConfig,
}

impl PerformanceMonitor {
    /// Create a monitor with the given configuration.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: RwLock::new(MonitorInner::default()),
            config,
        }
    }

    /// Create a monitor with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MonitorConfig::default())
    }

    /// Get the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Execute `f`, recording wall-clock duration and outcome under `name`.
    ///
    /// The metric is appended whether or not the call succeeds; a failure
    /// propagates to the caller after the metric is recorded.
    pub async fn track_query<T, E, F, Fut>(&self, name: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = f().await;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        if execution_time_ms > self.config.slow_query_threshold_ms {
            warn!(
                query = name,
                execution_time_ms, "slow query detected"
            );
        }

        let metric = QueryMetric {
            name: name.to_string(),
            execution_time_ms,
            timestamp: Utc::now(),
            succeeded: result.is_ok(),
        };

        let mut inner = self.inner.write().await;
        inner.total_queries += 1;
        *inner.frequency.entry(name.to_string()).or_default() += 1;
        inner.metrics.push_back(metric);
        while inner.metrics.len() > self.config.max_metrics {
            inner.metrics.pop_front();
        }

        result
    }

    /// Retained metrics classified slow.
    pub async fn slow_queries(&self) -> Vec<QueryMetric> {
        let inner = self.inner.read().await;
        inner
            .metrics
            .iter()
            .filter(|m| m.is_slow(self.config.slow_query_threshold_ms))
            .cloned()
            .collect()
    }

    /// Build a report over the current monitor state.
    pub async fn performance_report(&self) -> PerformanceReport {
        let inner = self.inner.read().await;
        let average_execution_time_ms = if inner.metrics.is_empty() {
            0.0
        } else {
            inner
                .metrics
                .iter()
                .map(|m| m.execution_time_ms as f64)
                .sum::<f64>()
                / inner.metrics.len() as f64
        };

        PerformanceReport {
            total_queries: inner.total_queries,
            average_execution_time_ms,
            slow_queries: inner
                .metrics
                .iter()
                .filter(|m| m.is_slow(self.config.slow_query_threshold_ms))
                .cloned()
                .collect(),
            query_frequency: inner.frequency.clone(),
        }
    }

    /// Reset the metric log, totals, and frequency counters.
    pub async fn clear_metrics(&self) {
        let mut inner = self.inner.write().await;
        inner.metrics.clear();
        inner.total_queries = 0;
        inner.frequency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strata_core::{StoreError, StrataError, StrataResult};

    #[tokio::test]
    async fn test_frequency_counts_successes_and_failures() {
        let monitor = PerformanceMonitor::with_defaults();

        let _: StrataResult<u32> = monitor.track_query("q", || async { Ok(1) }).await;
        let _: StrataResult<u32> = monitor
            .track_query("q", || async {
                Err(StrataError::Store(StoreError::ConnectionFailed {
                    reason: "refused".to_string(),
                }))
            })
            .await;
        let _: StrataResult<u32> = monitor.track_query("q", || async { Ok(3) }).await;

        let report = monitor.performance_report().await;
        assert_eq!(report.query_frequency.get("q"), Some(&3));
        assert_eq!(report.total_queries, 3);
    }

    #[tokio::test]
    async fn test_error_propagates_after_recording() {
        let monitor = PerformanceMonitor::with_defaults();

        let result: StrataResult<u32> = monitor
            .track_query("failing", || async {
                Err(StrataError::Store(StoreError::ConnectionFailed {
                    reason: "refused".to_string(),
                }))
            })
            .await;

        assert!(result.is_err());
        let report = monitor.performance_report().await;
        assert_eq!(report.total_queries, 1);
        assert!(!report.slow_queries.iter().any(|m| m.succeeded));
    }

    #[tokio::test]
    async fn test_slow_classification_is_threshold_based() {
        let monitor =
            PerformanceMonitor::new(MonitorConfig::new().with_slow_query_threshold_ms(5));

        let _: StrataResult<()> = monitor
            .track_query("slow", || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            })
            .await;
        let _: StrataResult<()> = monitor.track_query("fast", || async { Ok(()) }).await;

        let slow = monitor.slow_queries().await;
        assert_eq!(slow.len(), 1);
        assert_eq!(slow[0].name, "slow");
        assert!(slow[0].execution_time_ms > 5);
    }

    #[tokio::test]
    async fn test_retention_bound_evicts_oldest_but_keeps_totals() {
        let monitor = PerformanceMonitor::new(MonitorConfig::new().with_max_metrics(3));

        for i in 0..5u32 {
            let name = format!("q{}", i);
            let _: StrataResult<u32> = monitor
                .track_query(&name, move || async move { Ok(i) })
                .await;
        }

        let report = monitor.performance_report().await;
        assert_eq!(report.total_queries, 5);
        assert_eq!(report.query_frequency.len(), 5);

        let inner = monitor.inner.read().await;
        assert_eq!(inner.metrics.len(), 3);
        // Oldest evicted first.
        assert_eq!(inner.metrics.front().map(|m| m.name.as_str()), Some("q2"));
    }

    #[tokio::test]
    async fn test_clear_metrics_resets_everything() {
        let monitor = PerformanceMonitor::with_defaults();
        let _: StrataResult<u32> = monitor.track_query("q", || async { Ok(1) }).await;

        monitor.clear_metrics().await;

        let report = monitor.performance_report().await;
        assert_eq!(report.total_queries, 0);
        assert!(report.query_frequency.is_empty());
        assert_eq!(report.average_execution_time_ms, 0.0);
    }
}

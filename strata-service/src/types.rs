//! Domain and report types for the service layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use strata_core::DatabaseHealth;

// ============================================================================
// DOMAIN RECORDS
// ============================================================================

/// Aggregated conversion statistics for one user.
///
/// Produced by the `user_conversion_stats` server-side function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnalytics {
    pub user_id: Uuid,
    pub total_conversions: u64,
    pub completed: u64,
    pub failed: u64,
    pub total_bytes_processed: u64,
}

/// A user row from the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

/// A conversion job row from the `conversions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_format: String,
    pub target_format: String,
    pub status: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// OPTIMIZATION REPORT
// ============================================================================

/// Query-side numbers in an optimization report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPerformance {
    pub average_execution_time_ms: f64,
    pub total_queries: u64,
    pub slow_queries: u64,
}

/// Cache-side numbers in an optimization report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePerformance {
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
}

/// A single actionable suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Human-readable suggestion.
    pub message: String,
    /// Query name the suggestion concerns, when specific to one.
    pub query: Option<String>,
}

impl Recommendation {
    /// A suggestion not tied to a specific query.
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            query: None,
        }
    }

    /// A suggestion concerning one query name.
    pub fn for_query(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            query: Some(query.into()),
        }
    }
}

/// Categorized recommendations. Each rule fires independently and may
/// contribute zero or more entries per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub performance: Vec<Recommendation>,
    pub caching: Vec<Recommendation>,
    pub indexing: Vec<Recommendation>,
    pub queries: Vec<Recommendation>,
}

impl RecommendationSet {
    /// Whether no rule fired in any category.
    pub fn is_empty(&self) -> bool {
        self.performance.is_empty()
            && self.caching.is_empty()
            && self.indexing.is_empty()
            && self.queries.is_empty()
    }
}

/// Merged view of query performance, cache performance, store health, and
/// recommendations. Recomputed on each request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub query_performance: QueryPerformance,
    pub cache_performance: CachePerformance,
    pub database_health: DatabaseHealth,
    pub recommendations: RecommendationSet,
}

// ============================================================================
// THRESHOLD ALERTS
// ============================================================================

/// Alert severity. Alerts are data for the caller to act on, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// A non-fatal condition detected by threshold checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
}

impl Alert {
    /// Create a warning-severity alert.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            message: message.into(),
        }
    }

    /// Create a critical-severity alert.
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Critical,
            message: message.into(),
        }
    }
}

/// Overall classification derived from an alert set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    Healthy,
    Warning,
    Critical,
}

/// Result of a threshold check pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub alerts: Vec<Alert>,
    pub status: ThresholdStatus,
}

impl ThresholdReport {
    /// Classify an alert set: critical if any critical alert, warning if
    /// any alert at all, healthy otherwise.
    pub fn from_alerts(alerts: Vec<Alert>) -> Self {
        let status = if alerts
            .iter()
            .any(|a| a.severity == AlertSeverity::Critical)
        {
            ThresholdStatus::Critical
        } else if !alerts.is_empty() {
            ThresholdStatus::Warning
        } else {
            ThresholdStatus::Healthy
        };
        Self { alerts, status }
    }
}

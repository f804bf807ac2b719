//! Query metric record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tracked query execution.
///
/// Appended by the performance monitor on every tracked call, success or
/// failure. Retained in a bounded log; oldest entries are evicted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    /// Logical query name, e.g. `"conversions.find_with_cursor"`
    pub name: String,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
    /// When the query completed
    pub timestamp: DateTime<Utc>,
    /// Whether the wrapped call returned Ok
    pub succeeded: bool,
}

impl QueryMetric {
    /// Whether this execution exceeds the given slow-query threshold.
    pub fn is_slow(&self, threshold_ms: u64) -> bool {
        self.execution_time_ms > threshold_ms
    }
}

//! Backing-store health types
//!
//! Connectivity classification produced by the optimization layer's probe
//! and embedded in optimization reports.

use serde::{Deserialize, Serialize};

/// Connectivity status of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// The probe round-tripped successfully
    Connected,
    /// The probe failed
    Disconnected,
    /// No probe has run yet
    Unknown,
}

/// Result of a connectivity probe against the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseHealth {
    /// Connectivity classification
    pub connection_status: ConnectionStatus,
    /// Probe round-trip time in milliseconds (if a probe ran)
    pub response_time_ms: Option<i64>,
    /// Detail message, populated on failure
    pub message: Option<String>,
}

impl DatabaseHealth {
    /// Create a connected health result.
    pub fn connected(response_time_ms: i64) -> Self {
        Self {
            connection_status: ConnectionStatus::Connected,
            response_time_ms: Some(response_time_ms),
            message: None,
        }
    }

    /// Create a disconnected health result.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            connection_status: ConnectionStatus::Disconnected,
            response_time_ms: None,
            message: Some(message.into()),
        }
    }

    /// Create an unknown health result (no probe has run).
    pub fn unknown() -> Self {
        Self {
            connection_status: ConnectionStatus::Unknown,
            response_time_ms: None,
            message: None,
        }
    }
}

//! Error types for the monitoring core

use thiserror::Error;

/// Errors surfaced to monitor callers.
///
/// A sensor that fails to read is not an error here: the scheduler keeps the
/// last known value and tries again on its next interval.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("sensor not registered: {0}")]
    UnregisteredSensor(String),

    #[error("invalid refresh policy for sensor {sensor}: {reason}")]
    InvalidPolicy { sensor: String, reason: String },

    #[error("no sensors registered")]
    EmptyRegistry,

    #[error("failed to start poll scheduler: {0}")]
    SchedulerSpawn(String),

    #[error("sensor source was lost when the poll loop panicked")]
    SourceLost,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

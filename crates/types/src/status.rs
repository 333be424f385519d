//! Snapshot types handed to dashboards and status endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compact view of the latest values across all sensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestValues {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Last known value per sensor; sensors without data are omitted
    pub values: BTreeMap<String, f64>,
    /// Sensors whose last known value is stale
    pub stale_sensors: Vec<String>,
}

/// Monitor lifecycle and configuration summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    /// Polling interval per sensor, in seconds
    pub refresh_rates: BTreeMap<String, f64>,
    pub available_sensors: Vec<String>,
}

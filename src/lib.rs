//! helm-sens: engine and tank sensor monitor
//!
//! This library ties the monitoring core to its configuration:
//! - Per-sensor refresh policies loaded from a JSON config file
//! - Re-exports of the monitor service and the bundled sensor sources

pub mod config;

// Re-export commonly used types
pub use config::AppConfig;
pub use helm_sens_core::{MonitorError, MonitorService, RefreshPolicyTable, SensorSource};
pub use helm_sens_sources as sources;
pub use helm_sens_types::{LatestValues, MonitorStatus, SensorReading};

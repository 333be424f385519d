//! helm-sens-types: Shared data types for the helm-sens sensor monitor.
//!
//! This crate contains pure data types (readings, refresh policies, status
//! snapshots) shared by the monitoring core, the sensor sources and the
//! application. Nothing here owns a thread or a lock.

pub mod policy;
pub mod reading;
pub mod status;

pub use policy::{PolicySettings, RefreshPolicy};
pub use reading::{Reading, SensorReading};
pub use status::{LatestValues, MonitorStatus};

/// Opaque sensor identifier, e.g. `"rpm"` or `"battery"`.
///
/// The monitor never interprets it; units and formatting belong to consumers.
pub type SensorId = String;

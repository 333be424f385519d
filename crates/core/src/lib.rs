//! helm-sens-core: Sensor monitoring core for helm-sens.
//!
//! This crate contains the [`SensorSource`] seam, the per-sensor
//! [`RefreshPolicyTable`], the thread-safe [`ReadingStore`], the background
//! [`PollScheduler`] and the [`MonitorService`] facade consumers query.

pub mod constants;
mod error;
mod monitor;
mod policy_table;
mod poll_scheduler;
mod reading_store;
mod sensor_source;

pub use constants::{DEFAULT_POLICIES, POLL_THREAD_NAME};
pub use error::{MonitorError, Result};
pub use monitor::MonitorService;
pub use policy_table::RefreshPolicyTable;
pub use poll_scheduler::PollScheduler;
pub use reading_store::ReadingStore;
pub use sensor_source::{from_fn, BoxedSensorSource, FnSource, SensorSource, SourceError};

// Re-export types used in public signatures for convenience
pub use helm_sens_types::{
    LatestValues, MonitorStatus, Reading, RefreshPolicy, SensorId, SensorReading,
};

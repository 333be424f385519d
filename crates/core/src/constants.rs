//! Shared constants for the monitoring core

use helm_sens_types::RefreshPolicy;

/// Name given to the background polling thread
pub const POLL_THREAD_NAME: &str = "sensor-poll";

/// Refresh policies of the deployed engine sensors.
///
/// RPM changes fastest and is polled ten times per second; tank level and
/// temperature drift slowly.
pub const DEFAULT_POLICIES: [(&str, RefreshPolicy); 4] = [
    ("rpm", RefreshPolicy::from_millis(100, 500)),
    ("battery", RefreshPolicy::from_millis(1_000, 5_000)),
    ("fuel_level", RefreshPolicy::from_millis(2_000, 10_000)),
    ("temperature", RefreshPolicy::from_millis(2_000, 10_000)),
];

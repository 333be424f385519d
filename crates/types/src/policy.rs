//! Per-sensor refresh policies

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a sensor is polled and how long its reading stays trustworthy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Minimum time between two read attempts
    pub interval: Duration,
    /// Age beyond which a reading is reported stale
    pub max_age: Duration,
}

impl RefreshPolicy {
    pub const fn new(interval: Duration, max_age: Duration) -> Self {
        Self { interval, max_age }
    }

    pub const fn from_millis(interval_ms: u64, max_age_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(max_age_ms),
        )
    }

    /// Whether a reading can be refreshed before it ages out.
    ///
    /// An inconsistent policy still works; its readings are simply marked
    /// stale between polls.
    pub fn is_consistent(&self) -> bool {
        self.max_age >= self.interval
    }
}

/// Serialized form of a [`RefreshPolicy`], in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    pub interval_ms: u64,
    pub max_age_ms: u64,
}

impl From<PolicySettings> for RefreshPolicy {
    fn from(settings: PolicySettings) -> Self {
        RefreshPolicy::from_millis(settings.interval_ms, settings.max_age_ms)
    }
}

impl From<RefreshPolicy> for PolicySettings {
    fn from(policy: RefreshPolicy) -> Self {
        Self {
            interval_ms: u64::try_from(policy.interval.as_millis()).unwrap_or(u64::MAX),
            max_age_ms: u64::try_from(policy.max_age.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_consistency() {
        assert!(RefreshPolicy::from_millis(100, 500).is_consistent());
        assert!(RefreshPolicy::from_millis(1000, 1000).is_consistent());
        assert!(!RefreshPolicy::from_millis(2000, 500).is_consistent());
    }

    #[test]
    fn test_settings_deserialization() {
        let settings: PolicySettings =
            serde_json::from_str(r#"{"interval_ms": 2000, "max_age_ms": 10000}"#).unwrap();
        let policy = RefreshPolicy::from(settings);
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_age, Duration::from_secs(10));
    }

    #[test]
    fn test_oversized_durations_saturate_in_settings() {
        let policy = RefreshPolicy {
            interval: Duration::MAX,
            max_age: Duration::from_millis(1500),
        };
        let settings = PolicySettings::from(policy);
        assert_eq!(settings.interval_ms, u64::MAX);
        assert_eq!(settings.max_age_ms, 1500);
    }
}

//! Registry of sensors and their refresh policies

use crate::constants::DEFAULT_POLICIES;
use crate::error::{MonitorError, Result};
use helm_sens_types::{RefreshPolicy, SensorId};
use log::warn;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::time::Duration;

static DEFAULT_TABLE: Lazy<RefreshPolicyTable> = Lazy::new(|| {
    let policies = DEFAULT_POLICIES
        .iter()
        .map(|(sensor, policy)| (sensor.to_string(), *policy))
        .collect();
    RefreshPolicyTable::from_validated(policies)
});

/// The fixed set of sensors the monitor knows about, with one
/// [`RefreshPolicy`] each.
///
/// The table is built once and never changes; its key set is the sensor
/// registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicyTable {
    policies: BTreeMap<SensorId, RefreshPolicy>,
    tick: Duration,
}

impl RefreshPolicyTable {
    /// Build a table from `(sensor, policy)` pairs.
    ///
    /// Rejects an empty table and zero intervals. A policy whose `max_age`
    /// is shorter than its interval is accepted with a warning.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RefreshPolicy)>,
        S: Into<SensorId>,
    {
        let mut policies = BTreeMap::new();
        for (sensor, policy) in entries {
            let sensor = sensor.into();
            if policy.interval.is_zero() {
                return Err(MonitorError::InvalidPolicy {
                    sensor,
                    reason: "polling interval must be greater than zero".to_string(),
                });
            }
            if !policy.is_consistent() {
                warn!(
                    "Sensor {} max_age {:?} is shorter than its interval {:?}; readings will go stale between polls",
                    sensor, policy.max_age, policy.interval
                );
            }
            if policies.insert(sensor.clone(), policy).is_some() {
                warn!("Sensor {} registered twice, keeping the last policy", sensor);
            }
        }

        if policies.is_empty() {
            return Err(MonitorError::EmptyRegistry);
        }

        Ok(Self::from_validated(policies))
    }

    /// The policies of the deployed engine sensors
    pub fn defaults() -> Self {
        DEFAULT_TABLE.clone()
    }

    fn from_validated(policies: BTreeMap<SensorId, RefreshPolicy>) -> Self {
        let tick = policies
            .values()
            .map(|policy| policy.interval)
            .min()
            .unwrap_or(Duration::from_millis(100));
        Self { policies, tick }
    }

    /// Policy for a sensor, or [`MonitorError::UnregisteredSensor`]
    pub fn policy(&self, sensor: &str) -> Result<&RefreshPolicy> {
        self.policies
            .get(sensor)
            .ok_or_else(|| MonitorError::UnregisteredSensor(sensor.to_string()))
    }

    pub fn interval(&self, sensor: &str) -> Result<Duration> {
        self.policy(sensor).map(|policy| policy.interval)
    }

    pub fn max_age(&self, sensor: &str) -> Result<Duration> {
        self.policy(sensor).map(|policy| policy.max_age)
    }

    pub fn contains(&self, sensor: &str) -> bool {
        self.policies.contains_key(sensor)
    }

    /// Registered sensor identifiers, in sorted order
    pub fn sensors(&self) -> impl Iterator<Item = &str> + '_ {
        self.policies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RefreshPolicy)> + '_ {
        self.policies
            .iter()
            .map(|(sensor, policy)| (sensor.as_str(), policy))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Always false: construction rejects empty tables
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Scheduler tick: the shortest interval in the table
    pub fn tick(&self) -> Duration {
        self.tick
    }
}

impl Default for RefreshPolicyTable {
    fn default() -> Self {
        Self::defaults()
    }
}

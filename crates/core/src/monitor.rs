//! Monitor service: the query API in front of the poll scheduler
//!
//! Consumers (a REST layer, the console binary) only talk to
//! [`MonitorService`]. Queries never touch the sensor hardware; they read the
//! [`ReadingStore`] and evaluate staleness against the current time.

use crate::error::Result;
use crate::policy_table::RefreshPolicyTable;
use crate::poll_scheduler::PollScheduler;
use crate::reading_store::ReadingStore;
use crate::sensor_source::SensorSource;
use chrono::Utc;
use helm_sens_types::{
    LatestValues, MonitorStatus, RefreshPolicy, SensorId, SensorReading,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

/// Sensor monitor facade combining policies, store and scheduler.
///
/// All methods take `&self` and are safe to call from any thread; share the
/// service behind an `Arc`.
pub struct MonitorService {
    policies: Arc<RefreshPolicyTable>,
    store: Arc<ReadingStore>,
    scheduler: PollScheduler,
}

impl MonitorService {
    /// Create a stopped monitor polling `source` according to `policies`
    pub fn new<S>(policies: RefreshPolicyTable, source: S) -> Self
    where
        S: SensorSource + 'static,
    {
        let policies = Arc::new(policies);
        let store = Arc::new(ReadingStore::for_policies(&policies));
        let scheduler = PollScheduler::new(Arc::clone(&policies), Arc::clone(&store), Box::new(source));
        Self {
            policies,
            store,
            scheduler,
        }
    }

    /// Create a stopped monitor for the default engine sensors
    pub fn with_defaults<S>(source: S) -> Self
    where
        S: SensorSource + 'static,
    {
        Self::new(RefreshPolicyTable::defaults(), source)
    }

    /// Start background polling (no-op if already running)
    pub fn start(&self) -> Result<()> {
        self.scheduler.start()
    }

    /// Stop background polling and wait for the loop to exit (no-op if stopped)
    pub fn stop(&self) {
        self.scheduler.stop()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Latest reading for a sensor with query-time staleness.
    ///
    /// `Ok(None)` means the sensor is registered but has never produced a
    /// value. Unknown sensors fail with `UnregisteredSensor`.
    pub fn get_reading(&self, sensor: &str) -> Result<Option<SensorReading>> {
        let policy = self.policies.policy(sensor)?;
        let now = Instant::now();
        Ok(self
            .store
            .get(sensor)
            .map(|reading| reading.view(now, policy.max_age)))
    }

    /// Latest reading of every sensor that has one, with query-time staleness
    pub fn get_all_readings(&self) -> BTreeMap<SensorId, SensorReading> {
        let snapshot = self.store.get_all();
        let now = Instant::now();
        snapshot
            .into_iter()
            .filter_map(|(sensor, reading)| {
                let max_age = self.policies.max_age(&sensor).ok()?;
                Some((sensor, reading.view(now, max_age)))
            })
            .collect()
    }

    /// JSON form of [`get_reading`](Self::get_reading)
    pub fn get_reading_json(&self, sensor: &str) -> Result<Option<serde_json::Value>> {
        match self.get_reading(sensor)? {
            Some(reading) => Ok(Some(serde_json::to_value(reading)?)),
            None => Ok(None),
        }
    }

    /// JSON object keyed by sensor, as returned by [`get_all_readings`](Self::get_all_readings)
    pub fn get_all_readings_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.get_all_readings())?)
    }

    /// Compact snapshot of last known values and which of them are stale
    pub fn latest_values(&self) -> LatestValues {
        let readings = self.get_all_readings();
        let stale_sensors = readings
            .iter()
            .filter(|(_, reading)| reading.stale)
            .map(|(sensor, _)| sensor.clone())
            .collect();
        let values = readings
            .into_iter()
            .map(|(sensor, reading)| (sensor, reading.value))
            .collect();

        LatestValues {
            timestamp: Utc::now(),
            values,
            stale_sensors,
        }
    }

    /// Registered sensor identifiers
    pub fn available_sensors(&self) -> BTreeSet<SensorId> {
        self.policies.sensors().map(str::to_string).collect()
    }

    /// Refresh policy of a registered sensor
    pub fn policy(&self, sensor: &str) -> Result<RefreshPolicy> {
        self.policies.policy(sensor).copied()
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            running: self.is_running(),
            refresh_rates: self
                .policies
                .iter()
                .map(|(sensor, policy)| (sensor.to_string(), policy.interval.as_secs_f64()))
                .collect(),
            available_sensors: self.policies.sensors().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::sensor_source::{from_fn, SourceError};
    use helm_sens_types::Reading;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn constant_source(value: f64) -> impl SensorSource {
        from_fn(move |_: &str| Ok(value))
    }

    #[test]
    fn test_unknown_sensor_is_rejected() {
        let monitor = MonitorService::with_defaults(constant_source(1.0));
        assert!(matches!(
            monitor.get_reading("unknown"),
            Err(MonitorError::UnregisteredSensor(ref s)) if s == "unknown"
        ));

        let custom = MonitorService::new(
            RefreshPolicyTable::new([("depth", RefreshPolicy::from_millis(500, 2_000))]).unwrap(),
            constant_source(1.0),
        );
        assert!(custom.get_reading("unknown").is_err());
        assert!(custom.get_reading("rpm").is_err());
    }

    #[test]
    fn test_never_polled_sensor_is_absent() {
        let monitor = MonitorService::with_defaults(constant_source(0.0));
        for sensor in monitor.available_sensors() {
            assert!(monitor.get_reading(&sensor).unwrap().is_none());
        }
        assert!(monitor.get_all_readings().is_empty());
        assert!(monitor.get_reading_json("rpm").unwrap().is_none());
    }

    #[test]
    fn test_staleness_is_evaluated_at_query_time() {
        let monitor = MonitorService::with_defaults(constant_source(0.0));

        monitor.store.put("rpm", 1500.0, Instant::now()).unwrap();
        let fresh = monitor.get_reading("rpm").unwrap().unwrap();
        assert_eq!(fresh.value, 1500.0);
        assert!(!fresh.stale);

        // Same reading, aged past rpm's 500ms max_age
        let captured_at = Instant::now()
            .checked_sub(Duration::from_millis(600))
            .expect("monotonic clock too close to its origin");
        monitor
            .store
            .put_reading("rpm", Reading::captured(1500.0, captured_at))
            .unwrap();
        let aged = monitor.get_reading("rpm").unwrap().unwrap();
        assert_eq!(aged.value, 1500.0);
        assert!(aged.stale);
        assert!(aged.age >= Duration::from_millis(600));
    }

    #[test]
    fn test_rpm_goes_stale_after_source_disconnects() {
        let connected = Arc::new(AtomicBool::new(true));
        let link = Arc::clone(&connected);
        let monitor = MonitorService::new(
            RefreshPolicyTable::new([("rpm", RefreshPolicy::from_millis(100, 500))]).unwrap(),
            from_fn(move |sensor: &str| {
                if link.load(Ordering::SeqCst) {
                    Ok(1500.0)
                } else {
                    Err(SourceError::unavailable(sensor, "disconnected"))
                }
            }),
        );

        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(300));
        let reading = monitor.get_reading("rpm").unwrap().unwrap();
        assert_eq!(reading.value, 1500.0);
        assert!(!reading.stale);

        connected.store(false, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(600));
        let reading = monitor.get_reading("rpm").unwrap().unwrap();
        assert_eq!(reading.value, 1500.0);
        assert!(reading.stale);

        monitor.stop();
    }

    #[test]
    fn test_failing_sensor_does_not_block_others() {
        let monitor = MonitorService::new(
            RefreshPolicyTable::new([
                ("broken", RefreshPolicy::from_millis(50, 200)),
                ("rpm", RefreshPolicy::from_millis(50, 200)),
            ])
            .unwrap(),
            from_fn(|sensor: &str| match sensor {
                "broken" => Err(SourceError::unavailable(sensor, "open circuit")),
                _ => Ok(2000.0),
            }),
        );

        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(150));
        let first = monitor.get_reading("rpm").unwrap().unwrap();
        thread::sleep(Duration::from_millis(200));
        let later = monitor.get_reading("rpm").unwrap().unwrap();
        monitor.stop();

        assert!(monitor.get_reading("broken").unwrap().is_none());
        assert!(later.captured_instant > first.captured_instant);
        assert!(!later.stale);
    }

    #[test]
    fn test_failing_sensor_is_not_retried_faster_than_its_interval() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let monitor = MonitorService::new(
            RefreshPolicyTable::new([
                ("fast", RefreshPolicy::from_millis(20, 100)),
                ("flaky", RefreshPolicy::from_millis(200, 1_000)),
            ])
            .unwrap(),
            from_fn(move |sensor: &str| {
                if sensor == "flaky" {
                    counter.fetch_add(1, Ordering::SeqCst);
                    return Err(SourceError::unavailable(sensor, "no response"));
                }
                Ok(1.0)
            }),
        );

        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(500));
        monitor.stop();

        // Attempts at roughly 0, 200 and 400ms
        let attempts = attempts.load(Ordering::SeqCst);
        assert!((2..=4).contains(&attempts), "unexpected attempt count {}", attempts);
    }

    #[test]
    fn test_no_writes_after_stop() {
        let monitor = MonitorService::with_defaults(constant_source(13.2));
        monitor.start().unwrap();
        monitor.start().unwrap();
        thread::sleep(Duration::from_millis(250));
        monitor.stop();
        monitor.stop();

        let before: Vec<_> = monitor
            .store
            .get_all()
            .into_iter()
            .map(|(sensor, reading)| (sensor, reading.captured_at()))
            .collect();
        assert!(!before.is_empty());

        thread::sleep(Duration::from_millis(300));
        let after: Vec<_> = monitor
            .store
            .get_all()
            .into_iter()
            .map(|(sensor, reading)| (sensor, reading.captured_at()))
            .collect();
        assert_eq!(before, after);
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_queries_run_alongside_polling() {
        let monitor = Arc::new(MonitorService::new(
            RefreshPolicyTable::new([
                ("rpm", RefreshPolicy::from_millis(5, 50)),
                ("battery", RefreshPolicy::from_millis(5, 50)),
            ])
            .unwrap(),
            constant_source(42.0),
        ));
        monitor.start().unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    for _ in 0..500 {
                        for (_, reading) in monitor.get_all_readings() {
                            assert_eq!(reading.value, 42.0);
                        }
                        let _ = monitor.get_reading("rpm").unwrap();
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().unwrap();
        }
        monitor.stop();
        assert_eq!(monitor.get_all_readings().len(), 2);
    }

    #[test]
    fn test_latest_values_and_status() {
        let monitor = MonitorService::with_defaults(constant_source(0.0));
        monitor.store.put("battery", 12.7, Instant::now()).unwrap();
        let captured_at = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .expect("monotonic clock too close to its origin");
        monitor
            .store
            .put_reading("rpm", Reading::captured(850.0, captured_at))
            .unwrap();

        let latest = monitor.latest_values();
        assert_eq!(latest.values.len(), 2);
        assert_eq!(latest.values["battery"], 12.7);
        assert_eq!(latest.stale_sensors, vec!["rpm".to_string()]);

        let status = monitor.status();
        assert!(!status.running);
        assert_eq!(status.refresh_rates["rpm"], 0.1);
        assert_eq!(status.available_sensors.len(), 4);
    }

    #[test]
    fn test_json_views() {
        let monitor = MonitorService::with_defaults(constant_source(0.0));
        monitor.store.put("fuel_level", 64.0, Instant::now()).unwrap();

        let reading = monitor.get_reading_json("fuel_level").unwrap().unwrap();
        assert_eq!(reading["value"], 64.0);
        assert_eq!(reading["stale"], false);

        let all = monitor.get_all_readings_json().unwrap();
        assert!(all.get("fuel_level").is_some());
        assert!(all.get("rpm").is_none());
    }
}

//! Latest-reading cache shared between the poll loop and query callers
//!
//! The poll loop is the only writer. Any number of query callers read
//! concurrently. Readings are small `Copy` values, so every lock is held for
//! a single map operation or a snapshot copy.

use crate::error::{MonitorError, Result};
use crate::policy_table::RefreshPolicyTable;
use helm_sens_types::{Reading, SensorId};
use log::warn;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Thread-safe map from sensor identifier to its most recent [`Reading`]
pub struct ReadingStore {
    /// Fixed at construction, so it needs no lock
    registered: BTreeSet<SensorId>,
    readings: RwLock<HashMap<SensorId, Reading>>,
}

impl ReadingStore {
    /// Create an empty store accepting writes for the given sensors
    pub fn new<I, S>(sensors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        let registered: BTreeSet<SensorId> = sensors.into_iter().map(Into::into).collect();
        Self {
            readings: RwLock::new(HashMap::with_capacity(registered.len())),
            registered,
        }
    }

    /// Create a store for every sensor in a policy table
    pub fn for_policies(policies: &RefreshPolicyTable) -> Self {
        Self::new(policies.sensors())
    }

    pub fn is_registered(&self, sensor: &str) -> bool {
        self.registered.contains(sensor)
    }

    /// Replace a sensor's reading with `value` captured at `captured_at`
    pub fn put(&self, sensor: &str, value: f64, captured_at: Instant) -> Result<()> {
        self.put_reading(sensor, Reading::captured(value, captured_at))
    }

    /// Replace a sensor's reading
    pub fn put_reading(&self, sensor: &str, reading: Reading) -> Result<()> {
        if !self.is_registered(sensor) {
            return Err(MonitorError::UnregisteredSensor(sensor.to_string()));
        }

        let mut readings = self.write_map();
        // Only the first write for a sensor allocates its key
        match readings.get_mut(sensor) {
            Some(slot) => *slot = reading,
            None => {
                readings.insert(sensor.to_string(), reading);
            }
        }
        Ok(())
    }

    /// Current reading for a sensor, or `None` if it was never written
    pub fn get(&self, sensor: &str) -> Option<Reading> {
        self.read_map().get(sensor).copied()
    }

    /// Point-in-time copy of every reading.
    ///
    /// Sensors without a reading are omitted. The copy is taken under one
    /// lock, so no write can interleave with it.
    pub fn get_all(&self) -> BTreeMap<SensorId, Reading> {
        self.read_map()
            .iter()
            .map(|(sensor, reading)| (sensor.clone(), *reading))
            .collect()
    }

    /// Number of sensors that have a reading
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written Reading
    // behind (assignment of a Copy value), so poisoned guards are recovered.
    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<SensorId, Reading>> {
        self.readings.read().unwrap_or_else(|poisoned| {
            warn!("Reading store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<SensorId, Reading>> {
        self.readings.write().unwrap_or_else(|poisoned| {
            warn!("Reading store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_absent_until_written() {
        let store = ReadingStore::new(["rpm", "battery"]);
        assert!(store.get("rpm").is_none());
        assert!(store.get_all().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_replaces_previous_reading() {
        let store = ReadingStore::new(["battery"]);
        let first = Instant::now();
        store.put("battery", 12.4, first).unwrap();
        store.put("battery", 12.9, first + Duration::from_secs(1)).unwrap();

        let reading = store.get("battery").unwrap();
        assert_eq!(reading.value(), 12.9);
        assert_eq!(reading.captured_at(), first + Duration::from_secs(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_unregistered_sensor_fails() {
        let store = ReadingStore::new(["rpm"]);
        let result = store.put("depth", 3.2, Instant::now());
        assert!(matches!(result, Err(MonitorError::UnregisteredSensor(ref s)) if s == "depth"));
        assert!(store.get("depth").is_none());
    }

    #[test]
    fn test_get_all_omits_sensors_without_readings() {
        let store = ReadingStore::new(["rpm", "battery", "fuel_level"]);
        store.put("rpm", 1500.0, Instant::now()).unwrap();

        let snapshot = store.get_all();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["rpm"].value(), 1500.0);
        assert!(!snapshot.contains_key("battery"));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = ReadingStore::new(["rpm"]);
        store.put("rpm", 800.0, Instant::now()).unwrap();
        let snapshot = store.get_all();

        store.put("rpm", 2400.0, Instant::now()).unwrap();
        assert_eq!(snapshot["rpm"].value(), 800.0);
        assert_eq!(store.get("rpm").unwrap().value(), 2400.0);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_readings() {
        let store = Arc::new(ReadingStore::new(["rpm", "battery"]));
        let base = Instant::now();

        // Every write pairs value v with capture time base + v ms, so a
        // reader can check both fields came from the same write.
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for v in 0..2_000u64 {
                    let captured_at = base + Duration::from_millis(v);
                    store.put("rpm", v as f64, captured_at).unwrap();
                    store.put("battery", v as f64, captured_at).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        for (_, reading) in store.get_all() {
                            let expected = base + Duration::from_millis(reading.value() as u64);
                            assert_eq!(reading.captured_at(), expected);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(store.get("rpm").unwrap().value(), 1999.0);
    }
}

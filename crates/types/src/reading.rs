//! Sensor readings and their query-time view

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

/// One successful sensor read: a value and the instant it was captured.
///
/// Readings are immutable and `Copy`; the store hands out copies, never
/// references into its map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    value: f64,
    captured_at: Instant,
    /// Wall-clock capture time, for display only. Age and staleness always
    /// use `captured_at`.
    wall_time: DateTime<Utc>,
}

impl Reading {
    /// Create a reading captured right now
    pub fn now(value: f64) -> Self {
        Self {
            value,
            captured_at: Instant::now(),
            wall_time: Utc::now(),
        }
    }

    /// Create a reading captured at a given monotonic instant.
    ///
    /// The wall-clock time is derived by subtracting the instant's age from
    /// the current time.
    pub fn captured(value: f64, captured_at: Instant) -> Self {
        let age = Instant::now().saturating_duration_since(captured_at);
        let age = chrono::Duration::from_std(age).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            value,
            captured_at,
            wall_time: Utc::now() - age,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn wall_time(&self) -> DateTime<Utc> {
        self.wall_time
    }

    /// Age of the reading relative to `now` (zero if `now` is earlier)
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.captured_at)
    }

    /// A reading is stale once its age strictly exceeds `max_age`
    pub fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    /// Build the consumer-facing view, evaluating age and staleness at `now`
    pub fn view(&self, now: Instant, max_age: Duration) -> SensorReading {
        let age = self.age(now);
        SensorReading {
            value: self.value,
            captured_at: self.wall_time,
            captured_instant: self.captured_at,
            stale: age > max_age,
            age,
        }
    }
}

/// A reading as seen by a query caller.
///
/// `stale` and `age` are derived when the query runs and are never stored,
/// so two queries for the same unrefreshed reading may disagree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    pub value: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(skip)]
    pub captured_instant: Instant,
    pub stale: bool,
    /// Serialized as fractional seconds
    #[serde(serialize_with = "serialize_secs")]
    pub age: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

//! The read interface the monitor uses to reach sensor hardware

use thiserror::Error;

/// Why a sensor source could not produce a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("sensor {sensor} unavailable: {reason}")]
    Unavailable { sensor: String, reason: String },

    #[error("source has no mapping for sensor {0}")]
    UnknownSensor(String),
}

impl SourceError {
    pub fn unavailable(sensor: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            sensor: sensor.to_string(),
            reason: reason.into(),
        }
    }
}

/// Trait for anything that can turn a sensor identifier into a value
///
/// A source is owned by the poll scheduler and only ever called from its
/// thread, so it needs to be `Send` but not `Sync`. Reads may block on I/O.
pub trait SensorSource: Send {
    /// Read the current converted value of a sensor
    fn read(&mut self, sensor: &str) -> Result<f64, SourceError>;

    /// Short name used in log messages
    fn name(&self) -> &str {
        "sensor-source"
    }
}

/// Type-erased sensor source for dynamic dispatch
pub type BoxedSensorSource = Box<dyn SensorSource>;

impl SensorSource for BoxedSensorSource {
    fn read(&mut self, sensor: &str) -> Result<f64, SourceError> {
        (**self).read(sensor)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Sensor source backed by a closure
pub struct FnSource<F> {
    read: F,
}

/// Wrap a closure as a [`SensorSource`]
pub fn from_fn<F>(read: F) -> FnSource<F>
where
    F: FnMut(&str) -> Result<f64, SourceError> + Send,
{
    FnSource { read }
}

impl<F> SensorSource for FnSource<F>
where
    F: FnMut(&str) -> Result<f64, SourceError> + Send,
{
    fn read(&mut self, sensor: &str) -> Result<f64, SourceError> {
        (self.read)(sensor)
    }

    fn name(&self) -> &str {
        "fn-source"
    }
}

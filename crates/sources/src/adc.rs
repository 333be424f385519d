//! Analog sensor conversion over a four-channel ADC
//!
//! Every engine sensor has the same shape: read a channel voltage, multiply
//! by a fixed factor, optionally clamp. The per-sensor constants live in
//! [`ADC_CHANNELS`] rather than in per-sensor code.

use helm_sens_core::{SensorSource, SourceError};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Full-scale input voltage of the ADC
pub const ADC_MAX_VOLTAGE: f64 = 4.096;

/// Conversion of one ADC channel into a sensor value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    pub sensor: &'static str,
    pub channel: u8,
    /// Multiplier applied to the channel voltage
    pub scale: f64,
    /// Optional `(min, max)` bounds for the converted value
    pub clamp: Option<(f64, f64)>,
}

impl ChannelSpec {
    pub fn convert(&self, voltage: f64) -> f64 {
        let value = voltage * self.scale;
        match self.clamp {
            Some((min, max)) => value.clamp(min, max),
            None => value,
        }
    }
}

/// Channel wiring and conversion factors of the engine harness
pub const ADC_CHANNELS: [ChannelSpec; 4] = [
    // Sender voltage to percent of tank
    ChannelSpec {
        sensor: "fuel_level",
        channel: 0,
        scale: 100.0 / ADC_MAX_VOLTAGE,
        clamp: Some((0.0, 100.0)),
    },
    ChannelSpec {
        sensor: "rpm",
        channel: 1,
        scale: 1000.0,
        clamp: None,
    },
    // 3:1 voltage divider on the battery input
    ChannelSpec {
        sensor: "battery",
        channel: 2,
        scale: 3.0,
        clamp: None,
    },
    // Degrees Celsius
    ChannelSpec {
        sensor: "temperature",
        channel: 3,
        scale: 100.0,
        clamp: None,
    },
];

/// Raw bus driver returning the voltage present on an ADC channel
pub trait ChannelReader: Send {
    fn voltage(&mut self, channel: u8) -> Result<f64, SourceError>;
}

/// Sensor source converting ADC channel voltages with a [`ChannelSpec`] table
pub struct AdcSensorSource<R> {
    reader: R,
    channels: &'static [ChannelSpec],
}

impl<R: ChannelReader> AdcSensorSource<R> {
    /// Source using the standard engine harness wiring
    pub fn new(reader: R) -> Self {
        Self::with_channels(reader, &ADC_CHANNELS)
    }

    pub fn with_channels(reader: R, channels: &'static [ChannelSpec]) -> Self {
        Self { reader, channels }
    }

    /// Sensors this source can convert
    pub fn sensors(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.channels.iter().map(|spec| spec.sensor)
    }

    fn spec(&self, sensor: &str) -> Option<&'static ChannelSpec> {
        self.channels.iter().find(|spec| spec.sensor == sensor)
    }

    /// Read and convert every mapped sensor, skipping channels that fail
    pub fn read_all(&mut self) -> BTreeMap<&'static str, f64> {
        let mut values = BTreeMap::new();
        for spec in self.channels {
            match self.reader.voltage(spec.channel) {
                Ok(voltage) => {
                    values.insert(spec.sensor, spec.convert(voltage));
                }
                Err(e) => warn!("Skipping {} (channel {}): {}", spec.sensor, spec.channel, e),
            }
        }
        values
    }

    pub fn into_reader(self) -> R {
        self.reader
    }
}

impl<R: ChannelReader> SensorSource for AdcSensorSource<R> {
    fn read(&mut self, sensor: &str) -> Result<f64, SourceError> {
        let spec = self
            .spec(sensor)
            .ok_or_else(|| SourceError::UnknownSensor(sensor.to_string()))?;
        let voltage = self.reader.voltage(spec.channel)?;
        let value = spec.convert(voltage);
        debug!(
            "ADC channel {} = {:.4} V -> {} = {}",
            spec.channel, voltage, sensor, value
        );
        Ok(value)
    }

    fn name(&self) -> &str {
        "adc"
    }
}

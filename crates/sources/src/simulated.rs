//! Simulated sensor source for running without hardware
//!
//! Each sensor follows a configurable waveform between a minimum and a
//! maximum. An optional dropout probability makes reads fail at random so
//! stale-value handling can be exercised end to end.

use helm_sens_core::{SensorSource, SourceError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Value generation mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaveMode {
    /// Constant value
    #[default]
    Manual,
    /// Sine wave oscillation
    SineWave,
    /// Sawtooth wave (linear ramp)
    Sawtooth,
    /// Triangle wave
    Triangle,
    /// Square wave
    Square,
}

/// Waveform of one simulated sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    pub mode: WaveMode,
    /// Value used in manual mode
    pub manual_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    /// Wave period in seconds
    pub period: f64,
}

impl WaveConfig {
    pub fn manual(value: f64) -> Self {
        Self {
            mode: WaveMode::Manual,
            manual_value: value,
            min_value: value,
            max_value: value,
            period: 1.0,
        }
    }

    pub fn wave(mode: WaveMode, min_value: f64, max_value: f64, period: f64) -> Self {
        Self {
            mode,
            manual_value: min_value,
            min_value,
            max_value,
            period,
        }
    }

    /// Value of the waveform `elapsed` seconds after start
    pub fn value_at(&self, elapsed: f64) -> f64 {
        let range = self.max_value - self.min_value;
        // Guard against a zero period turning every phase into NaN
        let period = if self.period > 0.0 { self.period } else { 1.0 };

        match self.mode {
            WaveMode::Manual => self.manual_value,
            WaveMode::SineWave => {
                let phase = (elapsed / period) * std::f64::consts::TAU;
                let normalized = (phase.sin() + 1.0) / 2.0;
                self.min_value + normalized * range
            }
            WaveMode::Sawtooth => {
                let normalized = (elapsed / period).fract();
                self.min_value + normalized * range
            }
            WaveMode::Triangle => {
                let phase = (elapsed / period).fract() * 2.0;
                let normalized = if phase <= 1.0 { phase } else { 2.0 - phase };
                self.min_value + normalized * range
            }
            WaveMode::Square => {
                if (elapsed / period).fract() < 0.5 {
                    self.min_value
                } else {
                    self.max_value
                }
            }
        }
    }
}

/// Sensor source producing waveforms instead of reading hardware
pub struct SimulatedSource {
    waves: BTreeMap<String, WaveConfig>,
    /// Probability in `[0, 1]` that a read reports the sensor unavailable
    dropout: f64,
    start_time: Instant,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self {
            waves: BTreeMap::new(),
            dropout: 0.0,
            start_time: Instant::now(),
        }
    }

    /// Plausible idle-to-cruise behaviour for the four engine sensors
    pub fn engine() -> Self {
        Self::new()
            .with_sensor("rpm", WaveConfig::wave(WaveMode::SineWave, 650.0, 3200.0, 30.0))
            .with_sensor("battery", WaveConfig::wave(WaveMode::Triangle, 12.2, 14.4, 60.0))
            .with_sensor("fuel_level", WaveConfig::wave(WaveMode::Sawtooth, 20.0, 95.0, 600.0))
            .with_sensor("temperature", WaveConfig::wave(WaveMode::SineWave, 68.0, 88.0, 120.0))
    }

    pub fn with_sensor(mut self, sensor: impl Into<String>, wave: WaveConfig) -> Self {
        self.waves.insert(sensor.into(), wave);
        self
    }

    pub fn with_dropout(mut self, probability: f64) -> Self {
        self.dropout = probability.clamp(0.0, 1.0);
        self
    }

    pub fn sensors(&self) -> impl Iterator<Item = &str> + '_ {
        self.waves.keys().map(String::as_str)
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::engine()
    }
}

impl SensorSource for SimulatedSource {
    fn read(&mut self, sensor: &str) -> Result<f64, SourceError> {
        let wave = self
            .waves
            .get(sensor)
            .ok_or_else(|| SourceError::UnknownSensor(sensor.to_string()))?;

        if self.dropout > 0.0 && rand::thread_rng().gen_bool(self.dropout) {
            return Err(SourceError::unavailable(sensor, "simulated dropout"));
        }

        Ok(wave.value_at(self.start_time.elapsed().as_secs_f64()))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

//! helm-sens-sources: Sensor source implementations for helm-sens.
//!
//! The monitoring core only sees the [`SensorSource`] trait. This crate
//! provides the analog front-end conversion (raw channel voltage to
//! physical units) and a simulated source for running without hardware.

mod adc;
mod simulated;

pub use adc::{AdcSensorSource, ChannelReader, ChannelSpec, ADC_CHANNELS, ADC_MAX_VOLTAGE};
pub use helm_sens_core::{SensorSource, SourceError};
pub use simulated::{SimulatedSource, WaveConfig, WaveMode};

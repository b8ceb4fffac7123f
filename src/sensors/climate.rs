//! BME280-class temperature / humidity sensor.
//!
//! The sensor reports Celsius and %RH; the agent works in Fahrenheit, so
//! conversion and plausibility checking live here rather than in callers.
//!
//! ## Dual-target design
//!
//! On the device: an I²C driver implements [`SensorPort`] and feeds raw
//! Celsius through [`ClimateReading::from_celsius`].
//! On host/test: [`SimClimateSensor`] reads from atomics for injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use crate::app::ports::SensorPort;
use crate::error::HardwareIoError;

/// Operating range of the BME280.
const MIN_CELSIUS: f64 = -40.0;
const MAX_CELSIUS: f64 = 85.0;

/// One temperature / humidity sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_f: f64,
    pub humidity_pct: f64,
}

impl ClimateReading {
    /// Convert a raw Celsius / %RH pair, rejecting out-of-range values.
    pub fn from_celsius(celsius: f64, humidity_pct: f64) -> Result<Self, HardwareIoError> {
        if !(MIN_CELSIUS..=MAX_CELSIUS).contains(&celsius) {
            return Err(HardwareIoError::SensorOutOfRange);
        }
        if !(0.0..=100.0).contains(&humidity_pct) {
            return Err(HardwareIoError::SensorOutOfRange);
        }
        Ok(Self {
            temperature_f: celsius_to_fahrenheit(celsius),
            humidity_pct,
        })
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

// ── Simulation ────────────────────────────────────────────────

/// Injection handle shared between a [`SimClimateSensor`] and whoever
/// drives the simulated environment.  Values are stored in hundredths.
#[derive(Clone)]
pub struct SimClimateProbe {
    centi_celsius: Arc<AtomicI32>,
    centi_humidity: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
}

impl SimClimateProbe {
    pub fn set(&self, celsius: f64, humidity_pct: f64) {
        self.centi_celsius
            .store((celsius * 100.0).round() as i32, Ordering::Relaxed);
        self.centi_humidity
            .store((humidity_pct * 100.0).round() as u32, Ordering::Relaxed);
    }

    /// Make subsequent reads fail with [`HardwareIoError::SensorReadFailed`].
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }
}

/// Simulated sensor for host builds.
pub struct SimClimateSensor {
    probe: SimClimateProbe,
    reads: u32,
}

impl SimClimateSensor {
    /// Start at 22.5 °C / 45 %RH.
    pub fn new() -> Self {
        let probe = SimClimateProbe {
            centi_celsius: Arc::new(AtomicI32::new(2250)),
            centi_humidity: Arc::new(AtomicU32::new(4500)),
            fail: Arc::new(AtomicBool::new(false)),
        };
        Self { probe, reads: 0 }
    }

    pub fn probe(&self) -> SimClimateProbe {
        self.probe.clone()
    }
}

impl Default for SimClimateSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for SimClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, HardwareIoError> {
        if self.probe.fail.load(Ordering::Relaxed) {
            return Err(HardwareIoError::SensorReadFailed);
        }
        // Small triangle-wave wobble (±0.2 °C) so consecutive samples differ.
        self.reads = self.reads.wrapping_add(1);
        let phase = (self.reads % 8) as f64;
        let tri = if phase < 4.0 { phase } else { 8.0 - phase };
        let wobble = tri * 0.1 - 0.2;

        let celsius = f64::from(self.probe.centi_celsius.load(Ordering::Relaxed)) / 100.0;
        let humidity = f64::from(self.probe.centi_humidity.load(Ordering::Relaxed)) / 100.0;
        ClimateReading::from_celsius(celsius + wobble, humidity)
    }
}

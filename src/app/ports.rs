//! Port traits: the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Registry / Sampler / Dispatcher
//! ```
//!
//! Driven adapters (GPIO lines, PWM channels, the climate sensor, the
//! uplink, the clock) implement these traits.  Every port is `Send` so the
//! concrete hardware can move into worker threads; shared ports are wrapped
//! in a [`parking_lot::Mutex`] so exactly one writer touches a line at a time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{CommsError, HardwareIoError};
use crate::sensors::ClimateReading;

use super::events::TelemetryRecord;

// ───────────────────────────────────────────────────────────────
// Digital output line
// ───────────────────────────────────────────────────────────────

/// Logic level on a digital output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// An opened GPIO output.  Opening happens at construction; the line is
/// released when the value is dropped.
pub trait OutputLine: Send {
    /// GPIO number, for log messages.
    fn pin(&self) -> u8;

    fn write(&mut self, level: Level) -> Result<(), HardwareIoError>;
}

/// Shared handle to an output line.  Relay and LED may hold clones of the
/// same handle when they are wired to one GPIO.
pub type LineHandle = Arc<Mutex<Box<dyn OutputLine>>>;

pub fn line_handle(line: impl OutputLine + 'static) -> LineHandle {
    Arc::new(Mutex::new(Box::new(line)))
}

// ───────────────────────────────────────────────────────────────
// PWM channel
// ───────────────────────────────────────────────────────────────

/// A PWM channel driven in per-mille of full duty.
pub trait PwmLine: Send {
    /// Enable the output stage.
    fn start(&mut self) -> Result<(), HardwareIoError> {
        Ok(())
    }

    /// Set duty in 0..=1000 per-mille.
    fn set_duty_permille(&mut self, permille: u16) -> Result<(), HardwareIoError>;

    /// Disable the output stage.
    fn stop(&mut self) -> Result<(), HardwareIoError> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor
// ───────────────────────────────────────────────────────────────

/// Read-side port for the temperature/humidity sensor.
pub trait SensorPort: Send {
    fn read(&mut self) -> Result<ClimateReading, HardwareIoError>;
}

/// The dispatcher (status) and the sampler (telemetry) both read the sensor.
pub type SharedSensor = Arc<Mutex<Box<dyn SensorPort>>>;

pub fn shared_sensor(sensor: impl SensorPort + 'static) -> SharedSensor {
    Arc::new(Mutex::new(Box::new(sensor)))
}

// ───────────────────────────────────────────────────────────────
// Uplink
// ───────────────────────────────────────────────────────────────

/// Serialises a telemetry record and sends it to the cloud.
pub trait Uplink: Send + Sync {
    fn publish(&self, record: &TelemetryRecord) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Blocking sleep.  Tests substitute a recording or gated implementation.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

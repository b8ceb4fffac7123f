//! Sensor subsystem: the climate (temperature / humidity) reading type and
//! the host-side simulated sensor.

pub mod climate;

pub use climate::{ClimateReading, SimClimateSensor};

//! Outbound application records.
//!
//! The [`TelemetrySampler`](super::telemetry::TelemetrySampler) builds one
//! [`TelemetryRecord`] per sample and hands it to the
//! [`Uplink`](super::ports::Uplink) port.  The serialised field names match
//! what the cloud-side message routes already query on.

use serde::Serialize;

/// A point-in-time telemetry sample.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub device_id: String,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// 1-based, process-lifetime monotonic.
    #[serde(rename = "messageId")]
    pub sequence: u64,
}

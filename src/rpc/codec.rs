//! JSON payload codec for direct methods and telemetry events.
//!
//! Inbound: `{"onoff": <bool>}`.  Decoding is strict; an empty body, a
//! missing `onoff` or a non-boolean value is rejected.  Unknown extra fields
//! are ignored.
//!
//! Outbound: the serialised [`TelemetryRecord`] wrapped in an
//! [`OutboundMessage`] with JSON content type and a `"{device}-{seq}"`
//! correlation id.

use serde::Deserialize;

use crate::app::events::TelemetryRecord;
use crate::error::{CommsError, PayloadDecodeError};

use super::transport::{CONTENT_ENCODING_UTF8, CONTENT_TYPE_JSON, OutboundMessage};

#[derive(Deserialize)]
struct OnOff {
    onoff: bool,
}

pub fn decode_on_off(payload: &[u8]) -> Result<bool, PayloadDecodeError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(PayloadDecodeError("empty payload".into()));
    }
    serde_json::from_slice::<OnOff>(payload)
        .map(|p| p.onoff)
        .map_err(|e| PayloadDecodeError(e.to_string()))
}

pub fn correlation_id(record: &TelemetryRecord) -> String {
    format!("{}-{}", record.device_id, record.sequence)
}

pub fn encode_telemetry(record: &TelemetryRecord) -> Result<OutboundMessage, CommsError> {
    let body = serde_json::to_vec(record).map_err(|e| CommsError::EncodeFailed(e.to_string()))?;
    Ok(OutboundMessage {
        body,
        content_type: CONTENT_TYPE_JSON,
        content_encoding: CONTENT_ENCODING_UTF8,
        correlation_id: correlation_id(record),
    })
}

//! Cloud transport abstraction.
//!
//! The agent talks to its control plane through [`CloudTransport`]: it
//! publishes telemetry events, registers named direct methods, and drains
//! cloud-to-device messages.  Connection management, retries and auth belong
//! to the implementation.  All methods take `&self`; direct-method handlers
//! are invoked from the transport's own threads.
//!
//! Concrete implementations:
//! - [`LoopbackTransport`](crate::adapters::loopback::LoopbackTransport):
//!   in-process, used on the development host and in tests.

use std::sync::Arc;
use std::time::Duration;

use crate::error::CommsError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_ENCODING_UTF8: &str = "utf-8";

/// Status returned to the caller of a direct method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodResponse {
    pub status: u16,
}

impl MethodResponse {
    pub const fn ok() -> Self {
        Self { status: 200 }
    }

    pub const fn bad_request() -> Self {
        Self { status: 400 }
    }

    pub const fn not_found() -> Self {
        Self { status: 404 }
    }

    pub const fn internal_error() -> Self {
        Self { status: 500 }
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Direct-method callback.  Receives the raw JSON payload.
pub type MethodHandler = Arc<dyn Fn(&[u8]) -> MethodResponse + Send + Sync>;

/// Device-to-cloud event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// UTF-8 JSON.
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub content_encoding: &'static str,
    /// Opaque id for correlating the event on the cloud side.
    pub correlation_id: String,
}

impl OutboundMessage {
    pub fn body_str(&self) -> &str {
        core::str::from_utf8(&self.body).unwrap_or("<non-utf8 body>")
    }
}

/// Cloud-to-device message, already completed (acknowledged) on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: Option<String>,
    pub body: Vec<u8>,
}

pub trait CloudTransport: Send + Sync {
    fn open(&self) -> Result<(), CommsError>;

    /// Register `handler` under `name`.  Names are unique per connection.
    fn register_method(&self, name: &str, handler: MethodHandler) -> Result<(), CommsError>;

    fn send_event(&self, message: OutboundMessage) -> Result<(), CommsError>;

    /// Wait up to `timeout` for the next cloud-to-device message and complete
    /// it.  `Ok(None)` on timeout.
    fn receive(&self, timeout: Duration) -> Result<Option<InboundMessage>, CommsError>;

    fn close(&self) -> Result<(), CommsError>;

    fn is_open(&self) -> bool;
}

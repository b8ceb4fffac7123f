//! Cloud-facing RPC surface.
//!
//! ```text
//!   CloudTransport ──▶ RemoteHandlers ──▶ ActuatorRegistry
//!        ▲
//!        └── TransportUplink ◀── TelemetrySampler
//! ```

pub mod codec;
pub mod handlers;
pub mod transport;

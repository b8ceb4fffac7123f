//! Remote direct-method handlers: `ControlRelay`, `ControlLED`, `ControlPWM`.
//!
//! Every path returns a status; no error reaches the transport.
//!
//! | Outcome                     | Status |
//! |-----------------------------|--------|
//! | actuator updated            | 200    |
//! | payload rejected            | 400    |
//! | actuator write failed       | 500    |
//!
//! A malformed payload never touches an actuator.  `ControlPWM` with
//! `false` blocks the calling transport thread until the ramp has wound
//! down (at most one step delay).

use std::sync::Arc;

use log::{error, info, warn};

use crate::app::registry::{ActuatorKind, ActuatorRegistry};
use crate::error::CommsError;

use super::codec::decode_on_off;
use super::transport::{CloudTransport, MethodResponse};

pub const CONTROL_RELAY: &str = "ControlRelay";
pub const CONTROL_LED: &str = "ControlLED";
pub const CONTROL_PWM: &str = "ControlPWM";

/// Method name → actuator it drives.
pub const METHODS: [(&str, ActuatorKind); 3] = [
    (CONTROL_RELAY, ActuatorKind::Relay),
    (CONTROL_LED, ActuatorKind::Led),
    (CONTROL_PWM, ActuatorKind::Pwm),
];

#[derive(Clone)]
pub struct RemoteHandlers {
    registry: Arc<ActuatorRegistry>,
}

impl RemoteHandlers {
    pub fn new(registry: Arc<ActuatorRegistry>) -> Self {
        Self { registry }
    }

    pub fn handle(&self, kind: ActuatorKind, payload: &[u8]) -> MethodResponse {
        let method = method_name(kind);
        let on = match decode_on_off(payload) {
            Ok(on) => on,
            Err(e) => {
                warn!("RPC | {} rejected: {}", method, e);
                return MethodResponse::bad_request();
            }
        };
        info!("RPC | {} onoff={}", method, on);
        match self.registry.set(kind, on) {
            Ok(()) => MethodResponse::ok(),
            Err(e) => {
                error!("RPC | {} failed: {}", method, e);
                MethodResponse::internal_error()
            }
        }
    }

    pub fn control_relay(&self, payload: &[u8]) -> MethodResponse {
        self.handle(ActuatorKind::Relay, payload)
    }

    pub fn control_led(&self, payload: &[u8]) -> MethodResponse {
        self.handle(ActuatorKind::Led, payload)
    }

    pub fn control_pwm(&self, payload: &[u8]) -> MethodResponse {
        self.handle(ActuatorKind::Pwm, payload)
    }

    /// Register all three methods on `transport`.
    pub fn register(&self, transport: &dyn CloudTransport) -> Result<(), CommsError> {
        for (name, kind) in METHODS {
            let handlers = self.clone();
            transport.register_method(name, Arc::new(move |payload| handlers.handle(kind, payload)))?;
        }
        info!("RPC | direct methods registered");
        Ok(())
    }
}

pub fn method_name(kind: ActuatorKind) -> &'static str {
    match kind {
        ActuatorKind::Relay => CONTROL_RELAY,
        ActuatorKind::Led => CONTROL_LED,
        ActuatorKind::Pwm => CONTROL_PWM,
    }
}

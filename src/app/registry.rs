//! Actuator registry: the single point of mutation for actuator state.
//!
//! Owns the relay, LED and PWM actuators and exposes named control
//! operations to the dispatcher and the remote handlers.  The registry
//! itself holds no lock: each actuator serialises its own writes, so a
//! relay write never waits behind a PWM stop.

use log::{info, warn};

use crate::drivers::ActuatorState;
use crate::drivers::pwm_ramp::PwmRampActuator;
use crate::drivers::switch::SwitchActuator;
use crate::error::HardwareIoError;

/// Which actuator an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorKind {
    Relay,
    Led,
    Pwm,
}

impl ActuatorKind {
    pub const ALL: [Self; 3] = [Self::Relay, Self::Led, Self::Pwm];

    pub fn label(self) -> &'static str {
        match self {
            Self::Relay => "Relay",
            Self::Led => "LED",
            Self::Pwm => "PWM",
        }
    }
}

/// Closed set of actuator behaviours.
pub enum Actuator {
    Switch(SwitchActuator),
    Ramp(PwmRampActuator),
}

impl Actuator {
    pub fn change_state(&self, state: ActuatorState) -> Result<(), HardwareIoError> {
        match self {
            Self::Switch(a) => a.change_state(state),
            Self::Ramp(a) => a.change_state(state),
        }
    }

    pub fn current_state(&self) -> ActuatorState {
        match self {
            Self::Switch(a) => a.current_state(),
            Self::Ramp(a) => a.current_state(),
        }
    }
}

pub struct ActuatorRegistry {
    relay: Actuator,
    led: Actuator,
    pwm: Actuator,
}

impl ActuatorRegistry {
    pub fn new(relay: SwitchActuator, led: SwitchActuator, pwm: PwmRampActuator) -> Self {
        Self {
            relay: Actuator::Switch(relay),
            led: Actuator::Switch(led),
            pwm: Actuator::Ramp(pwm),
        }
    }

    pub fn actuator(&self, kind: ActuatorKind) -> &Actuator {
        match kind {
            ActuatorKind::Relay => &self.relay,
            ActuatorKind::Led => &self.led,
            ActuatorKind::Pwm => &self.pwm,
        }
    }

    pub fn set(&self, kind: ActuatorKind, on: bool) -> Result<(), HardwareIoError> {
        let state = ActuatorState::from(on);
        self.actuator(kind).change_state(state).inspect_err(|e| {
            warn!("REGISTRY | {} -> {} failed: {}", kind.label(), state, e);
        })
    }

    pub fn set_relay(&self, on: bool) -> Result<(), HardwareIoError> {
        self.set(ActuatorKind::Relay, on)
    }

    pub fn set_led(&self, on: bool) -> Result<(), HardwareIoError> {
        self.set(ActuatorKind::Led, on)
    }

    pub fn set_pwm(&self, on: bool) -> Result<(), HardwareIoError> {
        self.set(ActuatorKind::Pwm, on)
    }

    pub fn state(&self, kind: ActuatorKind) -> ActuatorState {
        self.actuator(kind).current_state()
    }

    /// Drive every actuator off.  The PWM ramp is stopped (and joined)
    /// first; the first failure is reported after all three were attempted.
    pub fn shutdown(&self) -> Result<(), HardwareIoError> {
        let mut first_err = None;
        for kind in [ActuatorKind::Pwm, ActuatorKind::Led, ActuatorKind::Relay] {
            if let Err(e) = self.set(kind, false) {
                first_err.get_or_insert(e);
            }
        }
        info!("REGISTRY | all actuators off");
        first_err.map_or(Ok(()), Err)
    }
}

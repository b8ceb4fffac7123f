//! Actuator drivers and host-side simulated peripherals.

pub mod pwm_ramp;
pub mod sim;
pub mod switch;

/// Observable on/off state of any actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorState {
    #[default]
    Off,
    On,
}

impl ActuatorState {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for ActuatorState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl core::fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(if self.is_on() { "ON" } else { "OFF" })
    }
}

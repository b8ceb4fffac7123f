//! Binary on/off actuator (relay coil, indicator LED).
//!
//! A dumb actuator: one GPIO line, HIGH = on.  The level write and the
//! state update happen under the line's lock, so concurrent callers observe
//! last-write-wins and the recorded state always matches the last level
//! that reached the pin.

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::app::ports::{Level, LineHandle};
use crate::error::HardwareIoError;

use super::ActuatorState;

pub struct SwitchActuator {
    label: &'static str,
    line: LineHandle,
    on: AtomicBool,
}

impl SwitchActuator {
    /// Bind to an already-opened line.  The actuator starts Off; the line is
    /// assumed to have been driven low when it was opened.
    pub fn new(label: &'static str, line: LineHandle) -> Self {
        Self {
            label,
            line,
            on: AtomicBool::new(false),
        }
    }

    pub fn change_state(&self, state: ActuatorState) -> Result<(), HardwareIoError> {
        let mut line = self.line.lock();
        line.write(Level::from(state.is_on()))?;
        self.on.store(state.is_on(), Ordering::Release);
        debug!("{}: GPIO{} -> {:?}", self.label, line.pin(), state);
        Ok(())
    }

    pub fn current_state(&self) -> ActuatorState {
        ActuatorState::from(self.on.load(Ordering::Acquire))
    }

    pub fn pin(&self) -> u8 {
        self.line.lock().pin()
    }
}

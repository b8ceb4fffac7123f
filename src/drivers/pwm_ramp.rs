//! PWM "breathing" LED driver.
//!
//! While on, a dedicated worker thread sweeps the duty cycle up from the
//! floor to the ceiling and back down again, one step per `step_delay`,
//! until it is asked to stop.
//!
//! ```text
//!   Stopped ──start──▶ Starting ──▶ RampingUp ⇄ RampingDown
//!      ▲                                   │
//!      └──── worker joined, duty = 0 ◀── StopRequested
//! ```
//!
//! ## Stop contract
//!
//! [`PwmRampActuator::stop`] blocks until the worker has observed the
//! request, written 0 ‰ and exited.  Cancellation is polled after every duty
//! write, so the worst-case stop latency is one step delay.
//!
//! A duty write that fails mid-ramp terminates the worker; it makes a
//! best-effort 0 ‰ write and leaves the phase at `Stopped` so a later
//! `start` can retry cleanly.  The next `stop` returns the worker's error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::app::ports::{PwmLine, Sleeper};
use crate::error::HardwareIoError;
use crate::pins;

use super::ActuatorState;

// ── Ramp profile ──────────────────────────────────────────────

/// Fewest duty writes per ascent; anything lower is raised to this.
pub const MIN_RAMP_STEPS: u16 = 2;

/// Shape of one ramp cycle, in per-mille of full duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampProfile {
    pub floor_permille: u16,
    pub ceiling_permille: u16,
    /// Duty writes per ascent, floor and ceiling included.
    pub steps: u16,
    pub step_delay: Duration,
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            floor_permille: pins::PWM_FLOOR_PERMILLE,
            ceiling_permille: pins::PWM_CEILING_PERMILLE,
            steps: pins::PWM_RAMP_STEPS,
            step_delay: Duration::from_millis(pins::PWM_STEP_DELAY_MS),
        }
    }
}

impl RampProfile {
    /// Duty at `step` of the ascent, evenly spaced from floor to ceiling.
    pub fn duty_at(&self, step: u16) -> u16 {
        let last = self.steps.saturating_sub(1).max(1);
        let step = u32::from(step.min(last));
        let span = u32::from(self.ceiling_permille.saturating_sub(self.floor_permille));
        self.floor_permille + (span * step / u32::from(last)) as u16
    }

    pub fn ascent(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.steps).map(|s| self.duty_at(s))
    }

    /// Interior duties back toward the floor.  The peak ends the ascent and
    /// the floor starts the next one, so neither is written twice in a row.
    pub fn descent(&self) -> impl Iterator<Item = u16> + '_ {
        (1..self.steps.saturating_sub(1)).rev().map(|s| self.duty_at(s))
    }

    fn with_min_steps(mut self) -> Self {
        if self.steps < MIN_RAMP_STEPS {
            warn!("PWM: {} ramp steps raised to {}", self.steps, MIN_RAMP_STEPS);
            self.steps = MIN_RAMP_STEPS;
        }
        self
    }
}

// ── Phase ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampPhase {
    Stopped,
    Starting,
    RampingUp,
    RampingDown,
    StopRequested,
}

// ── Worker-shared state ───────────────────────────────────────

struct RampShared {
    line: Mutex<Box<dyn PwmLine>>,
    phase: Mutex<RampPhase>,
    cancel: AtomicBool,
    /// Last duty successfully written.
    duty: AtomicU16,
    profile: RampProfile,
    sleeper: Arc<dyn Sleeper>,
}

impl RampShared {
    fn write_duty(&self, permille: u16) -> Result<(), HardwareIoError> {
        self.line.lock().set_duty_permille(permille)?;
        self.duty.store(permille, Ordering::Release);
        Ok(())
    }

    /// Advance the phase unless a stop has already been requested.
    fn enter(&self, next: RampPhase) {
        let mut phase = self.phase.lock();
        if *phase != RampPhase::StopRequested {
            *phase = next;
        }
    }

    fn set_phase(&self, next: RampPhase) {
        *self.phase.lock() = next;
    }

    /// Write one duty value.  Returns `true` once a stop has been requested.
    fn step(&self, permille: u16) -> Result<bool, HardwareIoError> {
        self.write_duty(permille)?;
        if self.cancel.load(Ordering::Acquire) {
            return Ok(true);
        }
        self.sleeper.sleep(self.profile.step_delay);
        Ok(false)
    }

    fn run(&self) -> Result<(), HardwareIoError> {
        let profile = self.profile;
        loop {
            if self.cancel.load(Ordering::Acquire) {
                return Ok(());
            }
            self.enter(RampPhase::RampingUp);
            for duty in profile.ascent() {
                if self.step(duty)? {
                    return Ok(());
                }
            }
            if self.cancel.load(Ordering::Acquire) {
                return Ok(());
            }
            self.enter(RampPhase::RampingDown);
            for duty in profile.descent() {
                if self.step(duty)? {
                    return Ok(());
                }
            }
        }
    }

    fn wind_down(&self) -> Result<(), HardwareIoError> {
        self.write_duty(0)?;
        self.line.lock().stop()
    }
}

fn ramp_worker(shared: Arc<RampShared>) -> Result<(), HardwareIoError> {
    let result = shared.run();
    let wound_down = shared.wind_down();
    if let Err(e) = result {
        error!("PWM: ramp aborted: {}", e);
        if let Err(e) = wound_down {
            warn!("PWM: wind-down after abort failed: {}", e);
        }
        shared.set_phase(RampPhase::Stopped);
        return Err(e);
    }
    wound_down
}

// ── Actuator ──────────────────────────────────────────────────

/// PWM LED whose "on" state is a sustained duty-cycle ramp.
pub struct PwmRampActuator {
    shared: Arc<RampShared>,
    /// Serialises start/stop; holds the live worker.
    worker: Mutex<Option<JoinHandle<Result<(), HardwareIoError>>>>,
}

impl PwmRampActuator {
    /// A profile with fewer than [`MIN_RAMP_STEPS`] steps is raised to it.
    pub fn new(line: Box<dyn PwmLine>, profile: RampProfile, sleeper: Arc<dyn Sleeper>) -> Self {
        let profile = profile.with_min_steps();
        Self {
            shared: Arc::new(RampShared {
                line: Mutex::new(line),
                phase: Mutex::new(RampPhase::Stopped),
                cancel: AtomicBool::new(false),
                duty: AtomicU16::new(0),
                profile,
                sleeper,
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn change_state(&self, state: ActuatorState) -> Result<(), HardwareIoError> {
        match state {
            ActuatorState::On => self.start(),
            ActuatorState::Off => self.stop(),
        }
    }

    /// Launch the ramp worker.  No-op while a ramp is running; a worker that
    /// died on a write failure is joined and replaced.
    pub fn start(&self) -> Result<(), HardwareIoError> {
        let mut worker = self.worker.lock();
        if worker.is_some() && self.phase() != RampPhase::Stopped {
            debug!("PWM: ramp already running");
            return Ok(());
        }
        if let Some(dead) = worker.take() {
            reap(dead);
        }

        self.shared.set_phase(RampPhase::Starting);
        self.shared.cancel.store(false, Ordering::Release);
        if let Err(e) = self.shared.line.lock().start() {
            self.shared.set_phase(RampPhase::Stopped);
            return Err(e);
        }

        self.shared.set_phase(RampPhase::RampingUp);
        let shared = Arc::clone(&self.shared);
        *worker = Some(thread::spawn(move || ramp_worker(shared)));
        info!(
            "PWM: ramp started ({}..{}‰, {} steps, {:?}/step)",
            self.shared.profile.floor_permille,
            self.shared.profile.ceiling_permille,
            self.shared.profile.steps,
            self.shared.profile.step_delay
        );
        Ok(())
    }

    /// Request a stop and block until duty is back at zero.
    pub fn stop(&self) -> Result<(), HardwareIoError> {
        self.stop_with_grace(Duration::ZERO)
    }

    /// As [`stop`](Self::stop), but keep ramping for `grace` before the
    /// request is signalled.  `Duration::ZERO` requests immediately.
    pub fn stop_with_grace(&self, grace: Duration) -> Result<(), HardwareIoError> {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return Ok(());
        };

        if self.phase() == RampPhase::Stopped {
            // Only a failing worker marks itself Stopped; hand its error to the caller.
            return join_worker(handle);
        }

        if !grace.is_zero() {
            self.shared.sleeper.sleep(grace);
        }
        self.shared.set_phase(RampPhase::StopRequested);
        self.shared.cancel.store(true, Ordering::Release);

        let outcome = join_worker(handle);
        if outcome.is_err() {
            // Best effort: never leave the LED lit after a failed stop.
            let _ = self.shared.wind_down();
        }
        self.shared.set_phase(RampPhase::Stopped);
        info!("PWM: ramp stopped");
        outcome
    }

    pub fn current_state(&self) -> ActuatorState {
        ActuatorState::from(self.is_started())
    }

    /// `true` while the worker is alive and not yet fully stopped.
    pub fn is_started(&self) -> bool {
        self.phase() != RampPhase::Stopped
    }

    pub fn phase(&self) -> RampPhase {
        *self.shared.phase.lock()
    }

    /// Last duty written to the channel, per-mille.
    pub fn duty_permille(&self) -> u16 {
        self.shared.duty.load(Ordering::Acquire)
    }

    pub fn profile(&self) -> RampProfile {
        self.shared.profile
    }
}

impl Drop for PwmRampActuator {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("PWM: stop on drop failed: {}", e);
        }
    }
}

fn join_worker(handle: JoinHandle<Result<(), HardwareIoError>>) -> Result<(), HardwareIoError> {
    handle.join().unwrap_or_else(|_| {
        error!("PWM: ramp worker panicked");
        Err(HardwareIoError::PwmWriteFailed)
    })
}

fn reap(handle: JoinHandle<Result<(), HardwareIoError>>) {
    if let Err(e) = join_worker(handle) {
        warn!("PWM: previous ramp ended with error: {}", e);
    }
}

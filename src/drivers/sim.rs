//! Simulated peripherals for host builds.
//!
//! These implement the `embedded-hal` 1.0 traits so the same
//! [`HalOutputLine`](crate::adapters::hardware::HalOutputLine) and
//! [`HalPwmLine`](crate::adapters::hardware::HalPwmLine) adapters run on a
//! workstation as on the board.  Clones share state, so a test (or the
//! simulated console) keeps one clone as a probe while the adapter owns the
//! other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use embedded_hal::{digital, pwm};

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct SimPin {
    high: Arc<AtomicBool>,
    writes: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::Acquire)
    }

    /// Total level writes seen, including repeats.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }

    fn drive(&self, high: bool) -> Result<(), digital::ErrorKind> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(digital::ErrorKind::Other);
        }
        self.high.store(high, Ordering::Release);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl digital::ErrorType for SimPin {
    type Error = digital::ErrorKind;
}

impl digital::OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

// ── PWM ───────────────────────────────────────────────────────

/// Full-scale duty count; one count per per-mille.
pub const SIM_PWM_MAX_DUTY: u16 = 1000;

#[derive(Clone, Default)]
pub struct SimPwmChannel {
    duty: Arc<AtomicU16>,
    fail: Arc<AtomicBool>,
}

impl SimPwmChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current duty in counts of [`SIM_PWM_MAX_DUTY`].
    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::Acquire)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }
}

impl pwm::ErrorType for SimPwmChannel {
    type Error = pwm::ErrorKind;
}

impl pwm::SetDutyCycle for SimPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        SIM_PWM_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(pwm::ErrorKind::Other);
        }
        self.duty.store(duty.min(SIM_PWM_MAX_DUTY), Ordering::Release);
        Ok(())
    }
}

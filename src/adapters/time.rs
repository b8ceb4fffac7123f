//! Clock adapter.
//!
//! [`ThreadSleeper`] blocks the calling thread; it backs the telemetry
//! interval and the PWM step delay in production.  Tests substitute gated
//! or recording sleepers through the [`Sleeper`] port.

use std::time::Duration;

use crate::app::ports::Sleeper;

#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl ThreadSleeper {
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

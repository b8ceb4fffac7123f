//! Telemetry sampler and the interval guard.
//!
//! ```text
//!   start()                       worker thread
//!   ───────                       ─────────────
//!   Idle ──▶ Running ───────────▶ loop {
//!                                   ┌ guard ───────────────────────┐
//!   stop()                          │ run_state != Running → Idle  │
//!   Running ──▶ CancelRequested     │ toggle heartbeat             │
//!                                   │ read sensor, seq += 1        │
//!                                   │ copy send interval           │
//!                                   └──────────────────────────────┘
//!                                   uplink.publish(record)
//!                                   sleep(interval)
//!                                 }
//! ```
//!
//! The guard is the only lock shared with the dispatcher and the remote
//! handlers.  It is never held across the uplink send or the sleep, so a
//! `rate` change waits at most one sensor read, and it only affects the
//! sleep after the one in progress.
//!
//! `stop()` is fire-and-forget: the worker notices at the top of its next
//! iteration.  A `start()` that arrives before then simply flips the state
//! back to `Running` and the same worker carries on.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::app::events::TelemetryRecord;
use crate::app::ports::{Level, OutputLine, SharedSensor, Sleeper, Uplink};
use crate::error::{HardwareIoError, InputParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerRunState {
    Idle,
    Running,
    CancelRequested,
}

impl fmt::Display for SamplerRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::CancelRequested => "STOPPING",
        })
    }
}

// ── Interval guard ────────────────────────────────────────────

struct GuardState {
    send_interval_ms: u32,
    run_state: SamplerRunState,
    /// Last sequence number handed out; 0 before the first sample.
    sequence: u64,
    heartbeat: Box<dyn OutputLine>,
    heartbeat_level: Level,
}

impl GuardState {
    fn send_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.send_interval_ms))
    }
}

/// Mutual exclusion over the send interval, the sampler run-state and the
/// heartbeat/sensor section of each telemetry iteration.
pub struct IntervalGuard {
    state: Mutex<GuardState>,
}

impl IntervalGuard {
    fn new(send_interval_ms: u32, heartbeat: Box<dyn OutputLine>) -> Self {
        Self {
            state: Mutex::new(GuardState {
                send_interval_ms,
                run_state: SamplerRunState::Idle,
                sequence: 0,
                heartbeat,
                heartbeat_level: Level::Low,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock()
    }

    pub fn send_interval_ms(&self) -> u32 {
        self.lock().send_interval_ms
    }

    /// Store a new interval.  Zero is rejected and the prior value kept.
    pub fn set_send_interval_ms(&self, ms: u32) -> Result<(), InputParseError> {
        if ms == 0 {
            return Err(interval_error("0"));
        }
        self.lock().send_interval_ms = ms;
        info!("TELEM | send interval set to {} ms", ms);
        Ok(())
    }

    /// Parse operator input and store it as the new interval, all under the
    /// guard.  Anything but a positive integer leaves the interval unchanged.
    pub fn apply_interval_input(&self, raw: &str) -> Result<u32, InputParseError> {
        let text = raw.trim();
        let mut state = self.lock();
        let ms = text
            .parse::<u32>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| interval_error(text))?;
        state.send_interval_ms = ms;
        drop(state);
        info!("TELEM | send interval set to {} ms", ms);
        Ok(ms)
    }

    pub fn run_state(&self) -> SamplerRunState {
        self.lock().run_state
    }
}

fn interval_error(input: &str) -> InputParseError {
    InputParseError {
        input: input.to_string(),
        expected: "a positive number of milliseconds",
    }
}

// ── Sampler ───────────────────────────────────────────────────

struct SamplerShared {
    guard: IntervalGuard,
    sensor: SharedSensor,
    uplink: Arc<dyn Uplink>,
    sleeper: Arc<dyn Sleeper>,
    device_id: String,
}

impl SamplerShared {
    /// Heartbeat toggle, sensor read and record build.  Caller holds the guard.
    fn sample(&self, state: &mut GuardState) -> Result<TelemetryRecord, HardwareIoError> {
        let level = state.heartbeat_level.toggled();
        state.heartbeat.write(level)?;
        state.heartbeat_level = level;

        let reading = self.sensor.lock().read()?;
        state.sequence += 1;
        Ok(TelemetryRecord {
            device_id: self.device_id.clone(),
            temperature: reading.temperature_f,
            humidity: reading.humidity_pct,
            sequence: state.sequence,
        })
    }
}

fn sampler_worker(shared: Arc<SamplerShared>) -> Result<(), HardwareIoError> {
    debug!("TELEM | worker started");
    let result = loop {
        let (record, interval) = {
            let mut state = shared.guard.lock();
            if state.run_state != SamplerRunState::Running {
                state.run_state = SamplerRunState::Idle;
                break Ok(());
            }
            match shared.sample(&mut state) {
                Ok(record) => (record, state.send_interval()),
                Err(e) => {
                    state.run_state = SamplerRunState::Idle;
                    break Err(e);
                }
            }
        };

        if let Err(e) = shared.uplink.publish(&record) {
            warn!("TELEM | uplink of #{} failed: {}", record.sequence, e);
        }
        shared.sleeper.sleep(interval);
    };

    let mut state = shared.guard.lock();
    if let Err(e) = state.heartbeat.write(Level::Low) {
        debug!("TELEM | heartbeat reset failed: {}", e);
    }
    state.heartbeat_level = Level::Low;
    drop(state);

    match &result {
        Ok(()) => info!("TELEM | sampler stopped"),
        Err(e) => error!("TELEM | sampler aborted: {}", e),
    }
    result
}

/// Cancellable background telemetry loop.
pub struct TelemetrySampler {
    shared: Arc<SamplerShared>,
    /// Serialises start/shutdown; holds the worker handle.
    worker: Mutex<Option<JoinHandle<Result<(), HardwareIoError>>>>,
}

impl TelemetrySampler {
    pub fn new(
        device_id: impl Into<String>,
        send_interval_ms: u32,
        heartbeat: Box<dyn OutputLine>,
        sensor: SharedSensor,
        uplink: Arc<dyn Uplink>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            shared: Arc::new(SamplerShared {
                guard: IntervalGuard::new(send_interval_ms, heartbeat),
                sensor,
                uplink,
                sleeper,
                device_id: device_id.into(),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn guard(&self) -> &IntervalGuard {
        &self.shared.guard
    }

    pub fn start(&self) {
        let mut worker = self.worker.lock();
        {
            let mut state = self.shared.guard.lock();
            match state.run_state {
                SamplerRunState::Running => {
                    debug!("TELEM | already running");
                    return;
                }
                SamplerRunState::CancelRequested => {
                    state.run_state = SamplerRunState::Running;
                    info!("TELEM | stop withdrawn, sampler continues");
                    return;
                }
                SamplerRunState::Idle => {}
            }
        }

        // An Idle worker has left its loop; collect it before replacing it.
        if let Some(old) = worker.take() {
            reap(old);
        }
        self.shared.guard.lock().run_state = SamplerRunState::Running;
        let shared = Arc::clone(&self.shared);
        *worker = Some(thread::spawn(move || sampler_worker(shared)));
        info!(
            "TELEM | sampler started (every {} ms)",
            self.shared.guard.send_interval_ms()
        );
    }

    /// Request cancellation.  Does not wait for the worker.
    pub fn stop(&self) {
        let mut state = self.shared.guard.lock();
        if state.run_state == SamplerRunState::Running {
            state.run_state = SamplerRunState::CancelRequested;
            info!("TELEM | stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == SamplerRunState::Running
    }

    pub fn run_state(&self) -> SamplerRunState {
        self.shared.guard.run_state()
    }

    pub fn send_interval(&self) -> Duration {
        self.shared.guard.lock().send_interval()
    }

    pub fn set_send_interval(&self, interval: Duration) -> Result<(), InputParseError> {
        let ms = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        self.shared.guard.set_send_interval_ms(ms)
    }

    /// Sequence number of the most recent sample; 0 before the first.
    pub fn last_sequence(&self) -> u64 {
        self.shared.guard.lock().sequence
    }

    /// Stop and join the worker.  Returns the worker's error if it died on
    /// a hardware fault.
    pub fn shutdown(&self) -> Result<(), HardwareIoError> {
        let mut worker = self.worker.lock();
        self.stop();
        let Some(handle) = worker.take() else {
            return Ok(());
        };
        handle.join().unwrap_or_else(|_| {
            error!("TELEM | worker panicked");
            self.shared.guard.lock().run_state = SamplerRunState::Idle;
            Err(HardwareIoError::SensorReadFailed)
        })
    }
}

fn reap(handle: JoinHandle<Result<(), HardwareIoError>>) {
    match handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("TELEM | previous run ended with error: {}", e),
        Err(_) => error!("TELEM | previous worker panicked"),
    }
}

//! Interactive command dispatcher.
//!
//! Reads one command per line and turns it into registry / sampler calls.
//! Runs on the foreground thread; the only blocking points are the line
//! reads.  Hardware failures are printed and the loop carries on.
//!
//! The dispatcher is generic over its input and output so tests drive it
//! with in-memory buffers.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::commands::AppCommand;
use crate::app::ports::SharedSensor;
use crate::app::registry::{ActuatorKind, ActuatorRegistry};
use crate::app::telemetry::TelemetrySampler;
use crate::error::HardwareIoError;

pub struct CommandDispatcher<R, W> {
    input: R,
    out: W,
    registry: Arc<ActuatorRegistry>,
    sampler: Arc<TelemetrySampler>,
    sensor: SharedSensor,
    fan_on: bool,
    pulse_on: bool,
    exit: bool,
}

impl<R: BufRead, W: Write> CommandDispatcher<R, W> {
    pub fn new(
        input: R,
        out: W,
        registry: Arc<ActuatorRegistry>,
        sampler: Arc<TelemetrySampler>,
        sensor: SharedSensor,
    ) -> Self {
        Self {
            input,
            out,
            registry,
            sampler,
            sensor,
            fan_on: false,
            pulse_on: false,
            exit: false,
        }
    }

    /// Run until `exit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        while !self.exit {
            match self.read_line()? {
                Some(line) => self.handle_line(&line)?,
                None => {
                    info!("Console closed, exiting");
                    self.handle(AppCommand::Exit)?;
                }
            }
        }
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match line.parse::<AppCommand>() {
            Ok(cmd) => self.handle(cmd),
            Err(e) => {
                debug!("Console: {}", e);
                writeln!(self.out, "Command not recognized! Try again.")
            }
        }
    }

    pub fn handle(&mut self, cmd: AppCommand) -> io::Result<()> {
        match cmd {
            AppCommand::Exit => {
                writeln!(self.out, "Exiting!")?;
                self.exit = true;
                if self.sampler.is_running() {
                    self.sampler.stop();
                    self.write_status()?;
                }
                return Ok(());
            }
            AppCommand::Fan => {
                let res = self.registry.set_led(!self.fan_on);
                self.report("fan", res)?;
                self.fan_on = self.registry.state(ActuatorKind::Led).is_on();
            }
            AppCommand::Status => {}
            AppCommand::Rate => self.update_send_interval()?,
            AppCommand::Send => {
                if self.sampler.is_running() {
                    self.sampler.stop();
                } else {
                    self.sampler.start();
                }
            }
            AppCommand::Pulse => {
                let res = self.registry.set_pwm(!self.pulse_on);
                self.report("pulse", res)?;
                // A ramp that died on a write failure reads Off here.
                self.pulse_on = self.registry.state(ActuatorKind::Pwm).is_on();
            }
        }
        self.write_status()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // ── internals ─────────────────────────────────────────────

    /// The line is read before the interval guard is taken; only the parse
    /// and store happen under it.
    fn update_send_interval(&mut self) -> io::Result<()> {
        write!(self.out, "Enter new send interval rate (ms): ")?;
        self.out.flush()?;
        let line = self.read_line()?.unwrap_or_default();
        let guard = self.sampler.guard();
        match guard.apply_interval_input(&line) {
            Ok(ms) => writeln!(self.out, "Send interval rate (ms): {}", ms),
            Err(e) => {
                debug!("Console: {}", e);
                writeln!(self.out, "input error, interval not set: {}", guard.send_interval_ms())
            }
        }
    }

    /// Print a hardware failure, if any.
    fn report(&mut self, what: &str, res: Result<(), HardwareIoError>) -> io::Result<()> {
        if let Err(e) = res {
            warn!("Console: {} failed: {}", what, e);
            writeln!(self.out, "{} failed: {}", what, e)?;
        }
        Ok(())
    }

    fn write_status(&mut self) -> io::Result<()> {
        let reading = self.sensor.lock().read();
        let out = &mut self.out;

        writeln!(out)?;
        writeln!(out, "DEVICE STATUS")?;
        writeln!(out, "-------------")?;
        writeln!(out, "External Device  : {}", self.registry.state(ActuatorKind::Led))?;
        match reading {
            Ok(r) => {
                writeln!(out, "Temperature      : {:.1}°F", r.temperature_f)?;
                writeln!(out, "Relative humidity: {:.2}%", r.humidity_pct)?;
            }
            Err(e) => writeln!(out, "Sensor           : {}", e)?,
        }
        writeln!(out, "PWM LED          : {}", self.registry.state(ActuatorKind::Pwm))?;
        writeln!(
            out,
            "Telemetry        : {} (every {} ms)",
            self.sampler.run_state(),
            self.sampler.guard().send_interval_ms()
        )?;
        writeln!(out)?;
        writeln!(out, "Enter command ({}):", prompt_choices())?;
        out.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }
}

fn prompt_choices() -> String {
    AppCommand::ALL
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join("/")
}

//! Hardware adapter: bridges `embedded-hal` peripherals to the port traits.
//!
//! [`HalOutputLine`] and [`HalPwmLine`] wrap any `embedded-hal` 1.0 output
//! pin or PWM channel.  This is the only module that touches the HAL; the
//! control core sees [`OutputLine`] and [`PwmLine`].  On a development host
//! [`open_simulated`] wires the same adapters to the simulated peripherals in
//! [`drivers::sim`](crate::drivers::sim).

use embedded_hal::digital::{self, Error as _, OutputPin};
use embedded_hal::pwm::{self, Error as _, SetDutyCycle};
use log::{debug, info, warn};

use crate::app::agent::AgentHardware;
use crate::app::ports::{Level, OutputLine, PwmLine, line_handle, shared_sensor};
use crate::config::Settings;
use crate::drivers::sim::{SimPin, SimPwmChannel};
use crate::error::{HardwareInitError, HardwareIoError};
use crate::sensors::SimClimateSensor;
use crate::sensors::climate::SimClimateProbe;

// ── GPIO output ───────────────────────────────────────────────

/// An opened GPIO output.  Driven low on open and again on drop.
pub struct HalOutputLine<P: OutputPin> {
    pin_no: u8,
    pin: P,
}

impl<P: OutputPin> HalOutputLine<P> {
    pub fn open(pin_no: u8, mut pin: P) -> Result<Self, HardwareInitError> {
        pin.set_low().map_err(|e| HardwareInitError::GpioOpen {
            pin: pin_no,
            reason: gpio_reason(&e),
        })?;
        debug!("GPIO{} opened (low)", pin_no);
        Ok(Self { pin_no, pin })
    }
}

impl<P: OutputPin + Send> OutputLine for HalOutputLine<P> {
    fn pin(&self) -> u8 {
        self.pin_no
    }

    fn write(&mut self, level: Level) -> Result<(), HardwareIoError> {
        let res = match level {
            Level::High => self.pin.set_high(),
            Level::Low => self.pin.set_low(),
        };
        res.map_err(|e| {
            debug!("GPIO{} write: {}", self.pin_no, gpio_reason(&e));
            HardwareIoError::GpioWriteFailed(self.pin_no)
        })
    }
}

impl<P: OutputPin> Drop for HalOutputLine<P> {
    fn drop(&mut self) {
        if let Err(e) = self.pin.set_low() {
            warn!("GPIO{} release: {}", self.pin_no, gpio_reason(&e));
        }
        debug!("GPIO{} closed", self.pin_no);
    }
}

fn gpio_reason<E: digital::Error>(e: &E) -> String {
    format!("{:?}", e.kind())
}

// ── PWM channel ───────────────────────────────────────────────

/// An opened PWM channel.  Duty is forced to zero on open and on drop.
pub struct HalPwmLine<P: SetDutyCycle> {
    chip: u8,
    channel: u8,
    frequency_hz: u32,
    pwm: P,
    enabled: bool,
}

impl<P: SetDutyCycle> HalPwmLine<P> {
    pub fn open(chip: u8, channel: u8, frequency_hz: u32, mut pwm: P) -> Result<Self, HardwareInitError> {
        let open_err = |reason: String| HardwareInitError::PwmOpen {
            chip,
            channel,
            reason,
        };
        if pwm.max_duty_cycle() == 0 {
            return Err(open_err("channel reports zero duty range".into()));
        }
        pwm.set_duty_cycle_fully_off()
            .map_err(|e| open_err(pwm_reason(&e)))?;
        debug!("PWM {}/{} opened at {} Hz", chip, channel, frequency_hz);
        Ok(Self {
            chip,
            channel,
            frequency_hz,
            pwm,
            enabled: false,
        })
    }
}

impl<P: SetDutyCycle + Send> PwmLine for HalPwmLine<P> {
    fn start(&mut self) -> Result<(), HardwareIoError> {
        self.enabled = true;
        debug!("PWM {}/{} enabled at {} Hz", self.chip, self.channel, self.frequency_hz);
        Ok(())
    }

    fn set_duty_permille(&mut self, permille: u16) -> Result<(), HardwareIoError> {
        self.pwm
            .set_duty_cycle_fraction(permille.min(1000), 1000)
            .map_err(|e| {
                debug!("PWM {}/{} write: {}", self.chip, self.channel, pwm_reason(&e));
                HardwareIoError::PwmWriteFailed
            })
    }

    fn stop(&mut self) -> Result<(), HardwareIoError> {
        self.enabled = false;
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| HardwareIoError::PwmWriteFailed)
    }
}

impl<P: SetDutyCycle> Drop for HalPwmLine<P> {
    fn drop(&mut self) {
        if let Err(e) = self.pwm.set_duty_cycle_fully_off() {
            warn!("PWM {}/{} release: {}", self.chip, self.channel, pwm_reason(&e));
        }
        if self.enabled {
            debug!("PWM {}/{} closed while enabled", self.chip, self.channel);
        }
    }
}

fn pwm_reason<E: pwm::Error>(e: &E) -> String {
    format!("{:?}", e.kind())
}

// ── Simulated board ───────────────────────────────────────────

/// Probes into the simulated peripherals behind an [`AgentHardware`].
#[derive(Clone)]
pub struct SimulatedBoard {
    pub relay: SimPin,
    pub led: SimPin,
    pub heartbeat: SimPin,
    pub pwm: SimPwmChannel,
    pub climate: SimClimateProbe,
}

/// Open every line the agent needs on simulated peripherals.
///
/// When relay and LED share a GPIO, both actuators get the same line handle
/// so the line is opened and closed exactly once.
pub fn open_simulated(settings: &Settings) -> Result<(AgentHardware, SimulatedBoard), HardwareInitError> {
    let relay = SimPin::new();
    let relay_line = line_handle(HalOutputLine::open(settings.gpio_pin, relay.clone())?);

    let (led, led_line) = if settings.shares_relay_line() {
        info!("GPIO{} shared by relay and LED", settings.gpio_pin);
        (relay.clone(), relay_line.clone())
    } else {
        let led = SimPin::new();
        let line = line_handle(HalOutputLine::open(settings.led_gpio(), led.clone())?);
        (led, line)
    };

    let heartbeat = SimPin::new();
    let heartbeat_line = HalOutputLine::open(settings.heartbeat_pin, heartbeat.clone())?;

    let pwm = SimPwmChannel::new();
    let pwm_line = HalPwmLine::open(
        settings.pwm_chip,
        settings.pwm_channel,
        settings.pwm_frequency_hz,
        pwm.clone(),
    )?;

    let sensor = SimClimateSensor::new();
    let climate = sensor.probe();

    info!(
        "Simulated board: relay GPIO{}, LED GPIO{}, heartbeat GPIO{}, PWM GPIO{} ({}/{})",
        settings.gpio_pin,
        settings.led_gpio(),
        settings.heartbeat_pin,
        settings.pwm_pin,
        settings.pwm_chip,
        settings.pwm_channel
    );

    Ok((
        AgentHardware {
            relay_line,
            led_line,
            pwm: Box::new(pwm_line),
            heartbeat: Box::new(heartbeat_line),
            sensor: shared_sensor(sensor),
        },
        SimulatedBoard {
            relay,
            led,
            heartbeat,
            pwm,
            climate,
        },
    ))
}

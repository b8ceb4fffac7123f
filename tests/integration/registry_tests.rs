//! Actuator registry: routing, failures and concurrent writers.

use std::sync::Arc;
use std::thread;

use edge_agent::app::ports::{Level, line_handle};
use edge_agent::app::registry::{ActuatorKind, ActuatorRegistry};
use edge_agent::drivers::ActuatorState;
use edge_agent::drivers::pwm_ramp::{PwmRampActuator, RampProfile};
use edge_agent::drivers::switch::SwitchActuator;
use edge_agent::error::HardwareIoError;

use crate::mock_hw::{LineProbe, PwmCall, PwmProbe, RecordingLine, RecordingPwm, ShortSleeper, WAIT, wait_until};

fn registry() -> (ActuatorRegistry, LineProbe, LineProbe, PwmProbe) {
    let (relay, relay_probe) = RecordingLine::new(21);
    let (led, led_probe) = RecordingLine::new(20);
    let (pwm, pwm_probe) = RecordingPwm::new();
    let registry = ActuatorRegistry::new(
        SwitchActuator::new("Relay", line_handle(relay)),
        SwitchActuator::new("LED", line_handle(led)),
        PwmRampActuator::new(Box::new(pwm), RampProfile::default(), ShortSleeper::new()),
    );
    (registry, relay_probe, led_probe, pwm_probe)
}

#[test]
fn all_actuators_start_off() {
    let (reg, ..) = registry();
    for kind in ActuatorKind::ALL {
        assert_eq!(reg.state(kind), ActuatorState::Off);
    }
}

#[test]
fn set_relay_drives_only_the_relay_line() {
    let (reg, relay, led, _) = registry();
    reg.set_relay(true).unwrap();
    assert_eq!(relay.writes(), vec![Level::High]);
    assert!(led.writes().is_empty());
    assert_eq!(reg.state(ActuatorKind::Relay), ActuatorState::On);
    assert_eq!(reg.state(ActuatorKind::Led), ActuatorState::Off);

    reg.set_relay(false).unwrap();
    assert_eq!(relay.last(), Some(Level::Low));
    assert_eq!(reg.state(ActuatorKind::Relay), ActuatorState::Off);
}

#[test]
fn write_failure_propagates_and_keeps_state() {
    let (reg, _, led, _) = registry();
    led.set_failing(true);
    assert_eq!(reg.set_led(true), Err(HardwareIoError::GpioWriteFailed(20)));
    assert_eq!(reg.state(ActuatorKind::Led), ActuatorState::Off);
}

#[test]
fn set_pwm_starts_and_stops_ramp() {
    let (reg, _, _, pwm) = registry();
    reg.set_pwm(true).unwrap();
    assert_eq!(reg.state(ActuatorKind::Pwm), ActuatorState::On);
    assert!(wait_until(WAIT, || pwm.duties().len() >= 2));
    reg.set_pwm(false).unwrap();
    assert_eq!(reg.state(ActuatorKind::Pwm), ActuatorState::Off);
    assert!(pwm.calls().ends_with(&[PwmCall::Duty(0), PwmCall::Stop]));
}

#[test]
fn shutdown_turns_everything_off() {
    let (reg, relay, led, pwm) = registry();
    reg.set_relay(true).unwrap();
    reg.set_led(true).unwrap();
    reg.set_pwm(true).unwrap();
    reg.shutdown().unwrap();

    for kind in ActuatorKind::ALL {
        assert_eq!(reg.state(kind), ActuatorState::Off);
    }
    assert_eq!(relay.last(), Some(Level::Low));
    assert_eq!(led.last(), Some(Level::Low));
    assert!(pwm.calls().ends_with(&[PwmCall::Duty(0), PwmCall::Stop]));
}

#[test]
fn shutdown_attempts_all_and_reports_first_failure() {
    let (reg, relay, led, _) = registry();
    reg.set_relay(true).unwrap();
    led.set_failing(true);
    assert_eq!(reg.shutdown(), Err(HardwareIoError::GpioWriteFailed(20)));
    assert_eq!(relay.last(), Some(Level::Low));
}

#[test]
fn concurrent_writers_last_write_wins() {
    let (reg, relay, ..) = registry();
    let reg = Arc::new(reg);
    let writers: Vec<_> = (0..8)
        .map(|i| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for n in 0..50 {
                    reg.set_relay((i + n) % 2 == 0).unwrap();
                }
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }

    assert_eq!(relay.writes().len(), 400);
    let last = relay.last().unwrap();
    assert_eq!(reg.state(ActuatorKind::Relay).is_on(), last == Level::High);
}

#[test]
fn shared_line_serialises_relay_and_led() {
    let (line, probe) = RecordingLine::new(21);
    let shared = line_handle(line);
    let (pwm, _) = RecordingPwm::new();
    let reg = ActuatorRegistry::new(
        SwitchActuator::new("Relay", Arc::clone(&shared)),
        SwitchActuator::new("LED", shared),
        PwmRampActuator::new(Box::new(pwm), RampProfile::default(), ShortSleeper::new()),
    );
    reg.set_relay(true).unwrap();
    reg.set_led(false).unwrap();
    assert_eq!(probe.writes(), vec![Level::High, Level::Low]);
    // Each actuator reports the last state written through it.
    assert_eq!(reg.state(ActuatorKind::Relay), ActuatorState::On);
    assert_eq!(reg.state(ActuatorKind::Led), ActuatorState::Off);
}

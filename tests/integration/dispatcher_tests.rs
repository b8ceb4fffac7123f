//! Console dispatcher driven with in-memory input and output.

use std::io::{self, Cursor};

use edge_agent::app::ports::Level;
use edge_agent::app::registry::ActuatorKind;
use edge_agent::app::telemetry::SamplerRunState;
use edge_agent::drivers::ActuatorState;
use edge_agent::error::HardwareIoError;
use serde_json::Value;

use crate::mock_hw::{GatedSleeper, PwmCall, ShortSleeper, WAIT, connected_agent, wait_until};

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

#[test]
fn status_prints_block_and_prompt() {
    let (agent, _, _) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(io::empty(), Vec::new());
    d.handle_line("status").unwrap();
    let out = text(d.into_output());

    assert!(out.contains("DEVICE STATUS\n-------------\n"));
    assert!(out.contains("External Device  : OFF"));
    assert!(out.contains("Temperature      : 71.6°F"));
    assert!(out.contains("Relative humidity: 42.50%"));
    assert!(out.contains("Telemetry        : IDLE (every 1000 ms)"));
    assert!(out.ends_with("Enter command (status/fan/pulse/send/rate/exit):\n"));
}

#[test]
fn sensor_failure_in_status_is_reported_not_fatal() {
    let (agent, _, hw) = connected_agent(ShortSleeper::new());
    hw.sensor.set_failing(Some(HardwareIoError::SensorReadFailed));
    let mut d = agent.dispatcher(io::empty(), Vec::new());
    d.handle_line("status").unwrap();
    let out = text(d.into_output());
    assert!(out.contains("Sensor           : sensor read failed"));
    assert!(!out.contains("Temperature"));
}

#[test]
fn unknown_command_prints_error_only() {
    let (agent, _, _) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(io::empty(), Vec::new());
    d.handle_line("dance").unwrap();
    assert!(!d.exit_requested());
    assert_eq!(text(d.into_output()), "Command not recognized! Try again.\n");
}

#[test]
fn fan_toggles_led() {
    let (agent, _, hw) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(io::empty(), Vec::new());
    d.handle_line("fan").unwrap();
    assert_eq!(hw.led.last(), Some(Level::High));
    d.handle_line("fan").unwrap();
    assert_eq!(hw.led.last(), Some(Level::Low));
    let out = text(d.into_output());
    assert!(out.contains("External Device  : ON"));
    assert!(out.contains("External Device  : OFF"));
}

#[test]
fn fan_hardware_failure_is_printed_and_loop_continues() {
    let (agent, _, hw) = connected_agent(ShortSleeper::new());
    hw.led.set_failing(true);
    let mut d = agent.dispatcher(Cursor::new("fan\nstatus\nexit\n"), Vec::new());
    d.run().unwrap();
    let out = text(d.into_output());
    assert!(out.contains("fan failed: GPIO20 write failed"));
    assert!(out.contains("Exiting!"));
    assert_eq!(agent.registry().state(ActuatorKind::Led), ActuatorState::Off);
}

#[test]
fn pulse_toggles_pwm_ramp() {
    let (agent, _, hw) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(io::empty(), Vec::new());
    d.handle_line("pulse").unwrap();
    assert_eq!(agent.registry().state(ActuatorKind::Pwm), ActuatorState::On);
    assert!(wait_until(WAIT, || hw.pwm.duties().len() >= 2));
    d.handle_line("pulse").unwrap();
    assert_eq!(agent.registry().state(ActuatorKind::Pwm), ActuatorState::Off);
    assert!(hw.pwm.calls().ends_with(&[PwmCall::Duty(0), PwmCall::Stop]));
}

#[test]
fn pulse_after_dead_ramp_reports_error_and_can_restart() {
    let (agent, _, hw) = connected_agent(ShortSleeper::new());
    hw.pwm.fail_duty_writes_after(Some(3));
    let mut d = agent.dispatcher(io::empty(), Vec::new());
    d.handle_line("pulse").unwrap();
    assert!(wait_until(WAIT, || {
        agent.registry().state(ActuatorKind::Pwm) == ActuatorState::Off
    }));

    d.handle_line("pulse").unwrap();
    hw.pwm.fail_duty_writes_after(None);
    d.handle_line("pulse").unwrap();
    assert_eq!(agent.registry().state(ActuatorKind::Pwm), ActuatorState::On);
    assert_eq!(hw.pwm.count(PwmCall::Start), 2);

    d.handle_line("pulse").unwrap();
    assert_eq!(agent.registry().state(ActuatorKind::Pwm), ActuatorState::Off);
    let out = text(d.into_output());
    assert_eq!(out.matches("pulse failed: PWM write failed").count(), 1);
}

#[test]
fn rate_accepts_positive_integer() {
    let (agent, _, _) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(Cursor::new("250\n"), Vec::new());
    d.handle_line("rate").unwrap();
    assert_eq!(agent.sampler().guard().send_interval_ms(), 250);
    let out = text(d.into_output());
    assert!(out.starts_with("Enter new send interval rate (ms): Send interval rate (ms): 250\n"));
    assert!(out.contains("(every 250 ms)"));
}

#[test]
fn rate_rejects_garbage_and_keeps_prior_value() {
    let (agent, _, _) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(Cursor::new("rate\nabc\n"), Vec::new());
    d.run().unwrap();
    assert_eq!(agent.sampler().guard().send_interval_ms(), 1000);
    let out = text(d.into_output());
    assert!(out.contains("input error, interval not set: 1000"));
}

#[test]
fn end_of_input_behaves_as_exit() {
    let (agent, _, _) = connected_agent(ShortSleeper::new());
    let mut d = agent.dispatcher(Cursor::new("status\n"), Vec::new());
    d.run().unwrap();
    assert!(d.exit_requested());
    assert!(text(d.into_output()).ends_with("Exiting!\n"));
}

#[test]
fn send_twice_uplinks_two_records_then_stops() {
    let sleeper = GatedSleeper::new();
    let (agent, transport, _) = connected_agent(sleeper.clone());
    let mut d = agent.dispatcher(io::empty(), Vec::new());

    d.handle_line("send").unwrap();
    sleeper.wait_entered().unwrap();
    sleeper.release();
    sleeper.wait_entered().unwrap();
    d.handle_line("send").unwrap();
    assert_eq!(agent.sampler().run_state(), SamplerRunState::CancelRequested);
    sleeper.release();
    assert!(wait_until(WAIT, || agent.sampler().run_state() == SamplerRunState::Idle));

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    for (msg, seq) in sent.iter().zip([1, 2]) {
        let body: Value = serde_json::from_slice(&msg.body).unwrap();
        assert_eq!(body["messageId"], seq);
        assert_eq!(body["deviceId"], "edge-agent");
        assert_eq!(msg.content_type, "application/json");
        assert_eq!(msg.content_encoding, "utf-8");
        assert_eq!(msg.correlation_id, format!("edge-agent-{seq}"));
    }

    sleeper.open_gate();
    agent.shutdown().unwrap();
}

#[test]
fn exit_cancels_running_telemetry() {
    let sleeper = GatedSleeper::new();
    let (agent, _, _) = connected_agent(sleeper.clone());
    let mut d = agent.dispatcher(Cursor::new("send\nexit\n"), Vec::new());
    d.run().unwrap();

    assert!(d.exit_requested());
    assert!(!agent.sampler().is_running());
    let out = text(d.into_output());
    assert!(out.contains("Exiting!"));
    assert!(out.contains("Telemetry        : STOPPING"));

    sleeper.open_gate();
    agent.shutdown().unwrap();
}

//! Agent lifecycle on the simulated board.

use std::io::{self, Cursor, Write};
use std::sync::Arc;

use edge_agent::adapters::hardware::open_simulated;
use edge_agent::adapters::loopback::LoopbackTransport;
use edge_agent::app::agent::Agent;
use edge_agent::app::telemetry::SamplerRunState;
use edge_agent::config::Settings;
use edge_agent::error::{CommsError, Error};
use edge_agent::rpc::handlers::CONTROL_RELAY;
use edge_agent::rpc::transport::CloudTransport;

use crate::mock_hw::{GatedSleeper, ShortSleeper, WAIT, wait_until};

fn fast_settings() -> Settings {
    Settings {
        pwm_step_delay_ms: 1,
        ..Settings::default()
    }
}

#[test]
fn connect_then_remote_and_console_drive_simulated_pins() {
    let settings = fast_settings();
    let (hw, board) = open_simulated(&settings).unwrap();
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hw, transport.clone(), ShortSleeper::new());
    agent.connect().unwrap();
    assert!(transport.is_open());

    assert_eq!(transport.invoke(CONTROL_RELAY, br#"{"onoff":true}"#).unwrap().status, 200);
    assert!(board.relay.is_high());

    let mut d = agent.dispatcher(Cursor::new("fan\npulse\n"), Vec::new());
    d.run().unwrap();
    assert!(board.led.is_high());
    assert!(wait_until(WAIT, || board.pwm.duty() >= 100));

    agent.shutdown().unwrap();
    assert!(!board.relay.is_high());
    assert!(!board.led.is_high());
    assert_eq!(board.pwm.duty(), 0);
    assert!(!transport.is_open());
}

#[test]
fn connect_twice_fails_on_duplicate_methods() {
    let settings = fast_settings();
    let (hw, _board) = open_simulated(&settings).unwrap();
    let agent = Agent::new(settings, hw, Arc::new(LoopbackTransport::new()), ShortSleeper::new());
    agent.connect().unwrap();
    assert!(matches!(
        agent.connect(),
        Err(Error::Comms(CommsError::MethodAlreadyRegistered(_)))
    ));
}

#[test]
fn telemetry_reaches_transport_with_simulated_readings() {
    let settings = fast_settings();
    let (hw, board) = open_simulated(&settings).unwrap();
    board.climate.set(25.0, 55.0);
    let sleeper = GatedSleeper::new();
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hw, transport.clone(), sleeper.clone());
    agent.connect().unwrap();

    agent.sampler().start();
    sleeper.wait_entered().unwrap();
    assert!(board.heartbeat.is_high());

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    let temp = body["temperature"].as_f64().unwrap();
    assert!((temp - 77.0).abs() <= 0.4, "temperature {temp}");
    assert_eq!(body["humidity"], 55.0);

    sleeper.open_gate();
    agent.shutdown().unwrap();
    assert!(!board.heartbeat.is_high());
}

#[test]
fn link_down_drops_one_record_and_sampler_keeps_going() {
    let settings = fast_settings();
    let (hw, _board) = open_simulated(&settings).unwrap();
    let sleeper = GatedSleeper::new();
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hw, transport.clone(), sleeper.clone());
    agent.connect().unwrap();

    transport.set_failing_sends(true);
    agent.sampler().start();
    sleeper.wait_entered().unwrap();
    assert_eq!(transport.sent_total(), 0);
    assert!(agent.sampler().is_running());

    transport.set_failing_sends(false);
    sleeper.release();
    sleeper.wait_entered().unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert_eq!(body["messageId"], 2);
    assert_eq!(sent[0].correlation_id, format!("{}-2", agent.settings().device_id));

    sleeper.open_gate();
    agent.shutdown().unwrap();
}

#[test]
fn receiver_drains_messages_and_exits_on_close() {
    let settings = fast_settings();
    let (hw, _board) = open_simulated(&settings).unwrap();
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hw, transport.clone(), ShortSleeper::new());
    agent.connect().unwrap();

    let receiver = agent.spawn_receiver();
    transport.inject(Some("c2d-1"), b"hello device");
    assert!(wait_until(WAIT, || transport.pending_inbound() == 0));

    agent.shutdown().unwrap();
    receiver.join().unwrap();
}

#[test]
fn sampler_fault_is_reported_by_shutdown() {
    let settings = fast_settings();
    let (hw, board) = open_simulated(&settings).unwrap();
    board.climate.set_failing(true);
    let agent = Agent::new(settings, hw, Arc::new(LoopbackTransport::new()), ShortSleeper::new());
    agent.connect().unwrap();

    agent.sampler().start();
    assert!(wait_until(WAIT, || !agent.sampler().is_running()));
    assert!(matches!(agent.shutdown(), Err(Error::HardwareIo(_))));
}

/// A console whose output side is gone.
struct ClosedConsole;

impl Write for ClosedConsole {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn run_shuts_down_even_when_console_fails() {
    let settings = fast_settings();
    let (hw, board) = open_simulated(&settings).unwrap();
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hw, transport.clone(), ShortSleeper::new());
    agent.connect().unwrap();
    agent.registry().set_relay(true).unwrap();
    agent.sampler().start();
    let receiver = agent.spawn_receiver();

    let res = agent.run(Cursor::new("fan\n"), ClosedConsole);

    assert!(matches!(res, Err(Error::Console(_))));
    assert!(!transport.is_open());
    assert_eq!(agent.sampler().run_state(), SamplerRunState::Idle);
    assert!(!board.relay.is_high());
    receiver.join().unwrap();
}

#[test]
fn run_to_exit_returns_ok_and_closes_transport() {
    let settings = fast_settings();
    let (hw, _board) = open_simulated(&settings).unwrap();
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hw, transport.clone(), ShortSleeper::new());
    agent.connect().unwrap();

    agent.run(Cursor::new("status\nexit\n"), Vec::new()).unwrap();
    assert!(!transport.is_open());
}

//! Agent lifecycle: wires settings, hardware and transport together.
//!
//! ```text
//!   Agent::new ──▶ connect ──▶ run (console loop, then shutdown)
//!                    │                                  │
//!                    ├ transport.open                   ├ sampler stop + join
//!                    └ register ControlRelay/LED/PWM    ├ actuators off
//!                                                       └ transport.close
//! ```
//!
//! Lines are closed when the `Agent` (and with it the registry and sampler)
//! is dropped, after `shutdown` has driven everything low.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::adapters::uplink::TransportUplink;
use crate::app::dispatcher::CommandDispatcher;
use crate::app::ports::{LineHandle, OutputLine, PwmLine, SharedSensor, Sleeper};
use crate::app::registry::ActuatorRegistry;
use crate::app::telemetry::TelemetrySampler;
use crate::config::Settings;
use crate::drivers::pwm_ramp::PwmRampActuator;
use crate::drivers::switch::SwitchActuator;
use crate::error::{CommsError, Error, Result};
use crate::rpc::handlers::RemoteHandlers;
use crate::rpc::transport::CloudTransport;

/// How long the cloud-to-device receiver waits per poll.
const RECEIVE_POLL: Duration = Duration::from_millis(500);

/// Every opened peripheral the agent needs.
pub struct AgentHardware {
    pub relay_line: LineHandle,
    /// May be a clone of `relay_line` when the two share a GPIO.
    pub led_line: LineHandle,
    pub pwm: Box<dyn PwmLine>,
    pub heartbeat: Box<dyn OutputLine>,
    pub sensor: SharedSensor,
}

pub struct Agent {
    settings: Settings,
    registry: Arc<ActuatorRegistry>,
    sampler: Arc<TelemetrySampler>,
    sensor: SharedSensor,
    transport: Arc<dyn CloudTransport>,
}

impl Agent {
    pub fn new(
        settings: Settings,
        hw: AgentHardware,
        transport: Arc<dyn CloudTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let relay = SwitchActuator::new("Relay", hw.relay_line);
        let led = SwitchActuator::new("LED", hw.led_line);
        let pwm = PwmRampActuator::new(hw.pwm, settings.ramp_profile(), Arc::clone(&sleeper));
        let registry = Arc::new(ActuatorRegistry::new(relay, led, pwm));

        let uplink = Arc::new(TransportUplink::new(Arc::clone(&transport)));
        let sampler = Arc::new(TelemetrySampler::new(
            settings.device_id.clone(),
            settings.send_interval_ms,
            hw.heartbeat,
            Arc::clone(&hw.sensor),
            uplink,
            sleeper,
        ));

        Self {
            settings,
            registry,
            sampler,
            sensor: hw.sensor,
            transport,
        }
    }

    /// Open the transport and register the direct methods.
    pub fn connect(&self) -> Result<()> {
        self.transport.open()?;
        RemoteHandlers::new(Arc::clone(&self.registry)).register(self.transport.as_ref())?;
        info!("Agent '{}' connected", self.settings.device_id);
        Ok(())
    }

    pub fn dispatcher<R: BufRead, W: Write>(&self, input: R, out: W) -> CommandDispatcher<R, W> {
        CommandDispatcher::new(
            input,
            out,
            Arc::clone(&self.registry),
            Arc::clone(&self.sampler),
            Arc::clone(&self.sensor),
        )
    }

    /// Run the console until `exit` or end of input, then shut down.
    ///
    /// Shutdown happens even when the console fails; the console error wins
    /// and a shutdown error behind it is only logged.
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: W) -> Result<()> {
        let mut dispatcher = self.dispatcher(input, out);
        let console = dispatcher
            .handle_line("status")
            .and_then(|()| dispatcher.run());
        drop(dispatcher);

        let shutdown = self.shutdown();
        match console {
            Ok(()) => shutdown,
            Err(e) => {
                if let Err(s) = shutdown {
                    error!("Shutdown after console failure: {}", s);
                }
                Err(e.into())
            }
        }
    }

    /// Drain cloud-to-device messages on a background thread until the
    /// transport closes.
    pub fn spawn_receiver(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        thread::spawn(move || {
            loop {
                match transport.receive(RECEIVE_POLL) {
                    Ok(Some(msg)) => info!(
                        "C2D | message {}: {}",
                        msg.message_id.as_deref().unwrap_or("-"),
                        String::from_utf8_lossy(&msg.body)
                    ),
                    Ok(None) => {}
                    Err(CommsError::NotConnected) => break,
                    Err(e) => warn!("C2D | receive failed: {}", e),
                }
            }
        })
    }

    /// Stop telemetry (joining the worker), drive every actuator off and
    /// close the transport.  Every step runs; the first error is returned.
    pub fn shutdown(&self) -> Result<()> {
        let mut first: Option<Error> = None;
        if let Err(e) = self.sampler.shutdown() {
            warn!("Shutdown: sampler: {}", e);
            first.get_or_insert(e.into());
        }
        if let Err(e) = self.registry.shutdown() {
            warn!("Shutdown: actuators: {}", e);
            first.get_or_insert(e.into());
        }
        if let Err(e) = self.transport.close() {
            warn!("Shutdown: transport: {}", e);
            first.get_or_insert(e.into());
        }
        info!("Agent shut down");
        first.map_or(Ok(()), Err)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ActuatorRegistry> {
        &self.registry
    }

    pub fn sampler(&self) -> &Arc<TelemetrySampler> {
        &self.sampler
    }

    pub fn transport(&self) -> &Arc<dyn CloudTransport> {
        &self.transport
    }
}

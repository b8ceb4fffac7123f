//! Edge Agent: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HalOutputLine ×3  HalPwmLine  SimClimateSensor  ThreadSleeper │
//! │  LoopbackTransport (CloudTransport)   TransportUplink (Uplink) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ActuatorRegistry · TelemetrySampler · IntervalGuard   │    │
//! │  │  RemoteHandlers (transport threads)                    │    │
//! │  │  CommandDispatcher (this thread)                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settings come from `appsettings.json` (or the file named by
//! `EDGE_AGENT_CONFIG`), then `EDGE_AGENT_*` overrides.  Log level via
//! `RUST_LOG` (default `info`).

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};

use edge_agent::adapters::hardware::open_simulated;
use edge_agent::adapters::loopback::LoopbackTransport;
use edge_agent::adapters::time::ThreadSleeper;
use edge_agent::app::agent::Agent;
use edge_agent::config::Settings;

const CONFIG_ENV: &str = "EDGE_AGENT_CONFIG";
const DEFAULT_CONFIG: &str = "appsettings.json";

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Edge Agent v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Settings ───────────────────────────────────────────
    let path = std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let settings = Settings::load(&path).with_context(|| format!("loading {}", path.display()))?;
    println!("Send Interval: {}", settings.send_interval_ms);

    // ── 3. Hardware ───────────────────────────────────────────
    let (hardware, _board) = open_simulated(&settings).context("opening peripherals")?;

    // ── 4. Agent + cloud connection ───────────────────────────
    let transport = Arc::new(LoopbackTransport::new());
    let agent = Agent::new(settings, hardware, transport, Arc::new(ThreadSleeper::new()));

    println!("Establishing (secure) Cloud connection, please wait...");
    agent.connect().context("connecting to cloud")?;
    println!("IoT Hub Client connected");
    let receiver = agent.spawn_receiver();

    // ── 5. Interactive loop ───────────────────────────────────
    // Shuts the agent down on the way out, even if the console fails.
    let result = agent.run(io::stdin().lock(), io::stdout()).context("running agent");

    // ── 6. Teardown ───────────────────────────────────────────
    if receiver.join().is_err() {
        error!("C2D receiver panicked");
    }
    if let Err(e) = io::stdout().flush() {
        warn!("stdout flush failed: {}", e);
    }
    result
}

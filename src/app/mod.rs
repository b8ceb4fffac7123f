//! Application core: the actuator/telemetry controller.
//!
//! Everything here talks to hardware and the cloud through the **port
//! traits** in [`ports`], so the registry, sampler and dispatcher run
//! unchanged against simulated peripherals and test doubles.
//!
//! | Module       | Role                                            |
//! |--------------|-------------------------------------------------|
//! | `registry`   | single point of mutation for actuator state     |
//! | `telemetry`  | sampler worker + interval guard                 |
//! | `dispatcher` | interactive console commands                    |
//! | `agent`      | lifecycle: build, connect, run, shut down       |

pub mod agent;
pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod registry;
pub mod telemetry;

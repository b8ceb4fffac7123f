//! Edge-device control agent library.
//!
//! Exposes the controller core, adapters and simulated peripherals for the
//! binary and for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod rpc;
pub mod sensors;

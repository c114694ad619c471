//! Rust library for controlling six-zone whole-house audio amplifiers
//!
//! This library drives a multi-zone amplifier over its RS-232 control port
//! using the amplifier's fixed-width ASCII protocol. It supports:
//!
//! - Per-zone power, mute, volume, source, bass and treble control
//! - Status queries decoded into typed [`ZoneState`] records
//! - Full six-zone status sweeps that tolerate individual zone failures
//! - Partial updates as a REST layer would receive them ([`ZoneUpdate`])
//! - An in-process [`SimulatedAmplifier`] for testing without hardware
//!
//! # Quick Start
//!
//! ```no_run
//! use zone_amp::{AmpConfig, Amplifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AmpConfig::load("zone-amp.toml")?;
//!     let amp = Amplifier::open(&config)?;
//!
//!     // Turn zone 3 on and pick an input
//!     amp.set_power(3, true).await?;
//!     amp.set_source(3, 2).await?;
//!
//!     // Read back what the amplifier did
//!     let state = amp.zone(3)?.refresh().await?;
//!     println!("Zone 3: power={} source={}", state.power, state.source);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Amplifier**: fleet of six zones, status sweeps, request dispatch
//! - **Zone**: per-zone command issue and status refresh
//! - **Connection**: serialized access to the single link
//! - **Serial**: open-write-read-close exchanges on the RS-232 port
//! - **Protocol**: pure frame encoding and status record decoding
//! - **Types**: domain types and value ranges

mod amplifier;
mod config;
mod connection;
mod error;
pub mod protocol;
mod serial;
pub mod simulator;
mod types;
mod zone;

// Public exports
pub use amplifier::{Amplifier, StatusReport, ZoneFailure};
pub use config::AmpConfig;
pub use connection::{Link, Transport};
pub use error::{AmpError, Result, TransportError};
pub use protocol::Command;
pub use serial::SerialTransport;
pub use simulator::{Fault, SimulatedAmplifier};
pub use types::{
    ZoneId, ZoneState, ZoneUpdate, MAX_BALANCE, MAX_TONE, MAX_VOLUME, SOURCE_COUNT, ZONE_COUNT,
};
pub use zone::ZoneController;

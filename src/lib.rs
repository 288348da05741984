//! # lifx_lan_rs
//!
//! An async Rust client for the LIFX LAN protocol.
//!
//! This crate provides a **runtime-agnostic** async API to discover LIFX devices on
//! your local network and exchange typed messages with them over UDP. It contains
//! both the binary wire codec and a connector that correlates replies with the
//! requests that caused them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use lifx_lan_rs::{Connector, Hsbk, Kelvin, PowerLevel};
//!
//! async fn control_lights() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Connector::connect().await?;
//!
//!     // Find every light that answers within a second
//!     let devices = connector.discover(Duration::from_secs(1), None).await?;
//!
//!     // Turn them all on and set a warm white over half a second
//!     connector.send_broadcast(connector.builder().set_power(PowerLevel::ENABLED)).await?;
//!     let warm = Hsbk::white(Kelvin::create(2700).unwrap());
//!     for device in &devices {
//!         connector.send_unicast(device, connector.builder().light_set_color(warm, 500)).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Wire Codec**: Encode and decode the 36-byte [`Header`] and every [`Payload`] in the [`MessageType`] catalog
//! - **Message Builder**: Construct sendable messages with [`MessageBuilder`]
//! - **Discovery**: Find devices with [`Connector::discover`] and keep them in a [`DeviceRegistry`]
//! - **Requests**: Wait for one reply with [`Connector::request`] or many with [`Connector::request_all`]
//! - **Diagnostics**: Inspect sent and received traffic through [`MessageHistory`]
//!
//! ## Communication
//!
//! Devices listen on UDP port 56700. A connector owns a single socket; a
//! background task reads it and hands each reply to every operation waiting
//! for it. Delivery is not guaranteed and nothing is retried.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! lifx-lan-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! lifx-lan-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! lifx-lan-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod catalog;
mod config;
mod connector;
mod discovery;
mod dispatch;
mod errors;
mod header;
mod history;
mod message;
mod payload;
mod registry;
pub mod runtime;
mod transport;
mod types;

// Re-export public API
pub use catalog::{CatalogEntry, Direction, MessageType, catalog};
pub use config::{ConnectorConfig, LIFX_PORT, MESSAGE_RATE, NORMAL_TIMEOUT};
pub use connector::{Connector, Filter, RandomTokens, ResponseSet, SequentialTokens, TokenSource};
pub use discovery::DiscoverFilter;
pub use dispatch::Response;
pub use errors::{DecodeError, EncodeError, Error};
pub use header::{HEADER_SIZE, Header, TargetWidth, decode_target};
pub use history::{HistoryEntry, HistorySummary, MessageHistory, Traffic};
pub use message::{Message, MessageBuilder};
pub use payload::{
    EchoPayload, FirmwareInfo, GroupInfo, LightSetColor, LightSetPower, LightState, Payload,
    SignalInfo, StateService, TimeInfo, VersionInfo,
};
pub use registry::{Device, DeviceRegistry};
pub use types::{Hsbk, Kelvin, Label, PowerLevel, Service, Timestamp};

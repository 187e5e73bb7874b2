//! # homedeck-host - Host Application Transport
//!
//! Talks to the host application that owns the physical buttons: one
//! WebSocket connection per process, JSON frames in both directions.
//!
//! Depends on [`homedeck_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Connection
//! - [`HostClient`] - Connect, register, and receive inbound frames
//! - [`HostSender`] - Clonable handle for outbound commands
//!
//! ### Protocol
//! - [`parse_host_frame()`] - Parse one inbound frame into a [`HostFrame`]
//! - [`HostEvent`] - Closed set of events the plugin understands
//! - [`HostCommand`] - Outbound commands (`setImage`, `showAlert`, ...)
//!
//! ### Startup
//! - [`LaunchArgs`] - Flags passed by the host when it starts the plugin

pub mod client;
pub mod commands;
pub mod launch;
pub mod protocol;

pub use client::HostClient;
pub use commands::{registration_frame, HostCommand, HostSender};
pub use launch::LaunchArgs;
pub use protocol::{parse_host_frame, HostEvent, HostFrame};

//! # homedeck-app - Actions and Dispatch
//!
//! The plugin's behavior: routes host frames to button actions, keeps the
//! per-key state, polls device state and relays property inspector requests
//! to the cloud.
//!
//! ## Public API
//!
//! - [`Engine`] - Dispatches inbound frames; `run` drives it until the host
//!   goes away
//! - [`PluginContext`] - Host sender, API client and shared caches
//! - [`ControlAction`] - The scenario/device key
//! - [`PluginConfig`] - Contents of `homedeck.toml`

pub mod actions;
pub mod button;
pub mod config;
pub mod context;
pub mod engine;
pub mod inspector;
pub mod poll;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use actions::{ActionHandler, ActionKind, ControlAction};
pub use button::{ButtonInstance, ButtonRegistry};
pub use config::{load_config, PluginConfig, CONFIG_FILENAME};
pub use context::{GlobalSettingsCache, InspectorFocus, InspectorTarget, PluginContext};
pub use engine::Engine;
pub use poll::PollTask;

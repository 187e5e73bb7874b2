//! # homedeck-cloud - Smart-Home Cloud Client
//!
//! Request/response access to the smart-home cloud: list the account's
//! scenarios and devices, run scenarios, read and switch device power.
//!
//! Depends on [`homedeck_core`] for [`DeviceState`](homedeck_core::DeviceState)
//! and error handling.
//!
//! ## Public API
//!
//! - [`SmartHomeApi`] - The operations the button handlers rely on
//! - [`YandexClient`] - HTTP implementation over `reqwest`
//! - [`AccountInfo`], [`Scenario`], [`Device`] - Response models

pub mod api;
pub mod client;

pub use api::{
    AccountInfo, Capability, CapabilityState, Device, LocalSmartHomeApi, Scenario, SmartHomeApi,
    ON_OFF_CAPABILITY,
};
pub use client::{is_success_status, YandexClient, DEFAULT_BASE_URL};

//! # homedeck-core - Core Domain Types
//!
//! Foundation crate for the homedeck plugin. Provides domain types, error
//! handling, logging bootstrap and button artwork.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing, base64).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ButtonSettings`] - Per-button settings persisted by the host
//! - [`BindingType`] - Scenario or device binding
//! - [`GlobalSettings`] - Account-wide settings (API token)
//! - [`DeviceState`] - On/off state read from the cloud
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `is_fatal` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Artwork (`icons`)
//! - [`device_icon()`] - Render a device type + state as a data-URI SVG

pub mod error;
pub mod icons;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use icons::{device_icon, unknown_device_icon, UNKNOWN_DEVICE_TYPE};
pub use types::{BindingType, ButtonSettings, DeviceState, GlobalSettings};

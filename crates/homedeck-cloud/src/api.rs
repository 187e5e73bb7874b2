//! The smart-home API contract used by the button handlers, and the
//! response types it returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use homedeck_core::prelude::*;
use homedeck_core::DeviceState;

/// Capability type that marks a device as switchable.
pub const ON_OFF_CAPABILITY: &str = "devices.capabilities.on_off";

/// Account overview returned by `GET /user/info`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl AccountInfo {
    /// Devices that can be switched on and off.
    pub fn on_off_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.supports_on_off())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl Device {
    pub fn supports_on_off(&self) -> bool {
        self.capabilities.iter().any(Capability::is_on_off)
    }

    /// Current on/off state, if the device exposes the capability.
    pub fn on_off_state(&self) -> Option<DeviceState> {
        let capability = self.capabilities.iter().find(|c| c.is_on_off())?;
        let is_on = capability
            .state
            .as_ref()
            .and_then(|s| s.value.as_bool())
            .unwrap_or(false);
        Some(DeviceState {
            is_on,
            device_type: self.device_type.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Capability {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub state: Option<CapabilityState>,
}

impl Capability {
    pub fn is_on_off(&self) -> bool {
        self.kind == ON_OFF_CAPABILITY
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CapabilityState {
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Smart-home cloud operations.
///
/// Every call is a single request/response cycle authorized with `token`.
/// Nothing is retried here; callers decide whether to surface or log.
#[trait_variant::make(SmartHomeApi: Send)]
pub trait LocalSmartHomeApi {
    /// Scenarios and devices of the account. `None` when the body is empty
    /// or not JSON.
    async fn fetch_account_info(&self, token: &str) -> Result<Option<AccountInfo>>;

    /// Run a scenario.
    async fn run_scenario(&self, token: &str, scenario_id: &str) -> Result<()>;

    /// Read the on/off state of a device. `None` when the device has no
    /// on/off capability.
    async fn read_device_state(&self, token: &str, device_id: &str)
        -> Result<Option<DeviceState>>;

    /// Switch a device on or off.
    async fn set_device_on_off(&self, token: &str, device_id: &str, on: bool) -> Result<()>;
}

//! Domain types shared by the transport, the cloud client and the actions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// What a button is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    /// Run an automation scenario on press.
    #[default]
    Scenario,
    /// Toggle a device on press and mirror its on/off state.
    Device,
}

/// Per-button settings as stored by the host.
///
/// Keys the plugin does not know about are kept in `extra` so that a
/// round-trip through `setSettings` never loses data written by the
/// property inspector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSettings {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub binding: BindingType,

    /// Scenario or device id. Empty when nothing is selected yet.
    #[serde(default, deserialize_with = "null_as_default")]
    pub object_id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An explicit `null` means "not set", same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ButtonSettings {
    /// Build settings from a host payload, layered over the defaults.
    ///
    /// A missing or malformed payload yields the defaults.
    pub fn from_host(settings: Option<&Value>) -> Self {
        match settings {
            Some(Value::Object(patch)) => Self::default().merged(patch).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed button settings: {}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Shallow-merge `patch` over these settings.
    ///
    /// Keys present in `patch` replace the current values; everything else is
    /// kept. Applying the same patch twice gives the same result as once.
    pub fn merged(&self, patch: &Map<String, Value>) -> Result<Self> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        Ok(serde_json::from_value(Value::Object(current))?)
    }

    /// The bound scenario/device id, if one has been chosen.
    pub fn target_id(&self) -> Option<&str> {
        let id = self.object_id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub fn is_device(&self) -> bool {
        self.binding == BindingType::Device
    }

    /// JSON form suitable for a `setSettings` payload.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Process-wide settings shared by every button (the cloud account).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GlobalSettings {
    /// Parse the `settings` object of a `didReceiveGlobalSettings` payload.
    ///
    /// Anything that is not an object (or has a non-string token) is treated
    /// as "no settings" rather than an error.
    pub fn from_payload(settings: Option<&Value>) -> Self {
        settings
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// The bearer token, if a non-empty one is configured.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Live on/off state of a device, read from the cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub is_on: bool,
    /// Cloud device type, e.g. `devices.types.light`.
    pub device_type: String,
}

impl DeviceState {
    /// Value for the host's `setState` command.
    pub fn host_state(&self) -> u8 {
        u8::from(self.is_on)
    }
}

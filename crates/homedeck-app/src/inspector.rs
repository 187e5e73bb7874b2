//! Messages exchanged with the property inspector (the per-key configuration
//! UI).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use homedeck_cloud::AccountInfo;
use homedeck_core::prelude::*;

/// Messages the inspector sends through `sendToPlugin`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InspectorMessage {
    /// Partial settings to merge over the key's current settings.
    UpdateSettings {
        #[serde(default)]
        settings: Map<String, Value>,
    },
    /// Load scenarios and devices for the pickers.
    FetchData {
        #[serde(default)]
        token: Option<String>,
    },
    /// Store a new account token in the global settings.
    SaveToken { token: String },
    OpenUrl { url: String },
    #[serde(other)]
    Unknown,
}

impl InspectorMessage {
    /// Decode a `sendToPlugin` payload. Anything without a known `type` (or
    /// with malformed fields) is [`InspectorMessage::Unknown`].
    pub fn from_payload(payload: &Value) -> Self {
        serde_json::from_value(payload.clone()).unwrap_or_else(|e| {
            debug!("Unrecognized inspector message: {}", e);
            Self::Unknown
        })
    }
}

/// Entry of a picker list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub id: String,
    pub name: String,
}

/// `dataList` payload: every scenario, and only devices that can be switched.
pub fn data_list(info: &AccountInfo) -> Value {
    let scenarios: Vec<ListItem> = info
        .scenarios
        .iter()
        .map(|s| ListItem {
            id: s.id.clone(),
            name: s.name.clone(),
        })
        .collect();
    let devices: Vec<ListItem> = info
        .on_off_devices()
        .map(|d| ListItem {
            id: d.id.clone(),
            name: d.name.clone(),
        })
        .collect();

    json!({
        "type": "dataList",
        "scenarios": scenarios,
        "devices": devices,
    })
}

pub fn error_message(message: impl std::fmt::Display) -> Value {
    json!({
        "type": "error",
        "message": message.to_string(),
    })
}

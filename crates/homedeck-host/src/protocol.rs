//! Inbound host frame parsing.
//!
//! The host pushes one JSON object per WebSocket text frame:
//!
//! ```json
//! {"action": "com.example.homedeck.control", "event": "willAppear",
//!  "context": "A1B2", "device": "D1", "payload": {"settings": {}}}
//! ```
//!
//! Frames are parsed in two steps: first into a loose [`RawFrame`], then the
//! event name is matched into the closed [`HostEvent`] enum. Event names the
//! plugin does not handle become [`HostEvent::Unknown`] instead of an error.

use serde::Deserialize;
use serde_json::Value;

use homedeck_core::prelude::*;

/// A raw host frame (before the event name is interpreted)
#[derive(Debug, Clone, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    payload: Value,
}

/// Typed host events.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A key bound to one of our actions became visible.
    WillAppear { settings: Option<Value> },
    /// The host delivered the stored settings of a key.
    DidReceiveSettings { settings: Option<Value> },
    /// A key is no longer visible.
    WillDisappear,
    KeyDown,
    KeyUp,
    /// Opaque message from the property inspector.
    SendToPlugin { payload: Value },
    PropertyInspectorDidAppear,
    PropertyInspectorDidDisappear,
    DidReceiveGlobalSettings { settings: Option<Value> },
    SystemDidWakeUp,
    /// Any event name not listed above.
    Unknown { event: String },
}

impl HostEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &str {
        match self {
            HostEvent::WillAppear { .. } => "willAppear",
            HostEvent::DidReceiveSettings { .. } => "didReceiveSettings",
            HostEvent::WillDisappear => "willDisappear",
            HostEvent::KeyDown => "keyDown",
            HostEvent::KeyUp => "keyUp",
            HostEvent::SendToPlugin { .. } => "sendToPlugin",
            HostEvent::PropertyInspectorDidAppear => "propertyInspectorDidAppear",
            HostEvent::PropertyInspectorDidDisappear => "propertyInspectorDidDisappear",
            HostEvent::DidReceiveGlobalSettings { .. } => "didReceiveGlobalSettings",
            HostEvent::SystemDidWakeUp => "systemDidWakeUp",
            HostEvent::Unknown { event } => event,
        }
    }
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HostFrame {
    /// Full action identifier, e.g. `com.example.homedeck.control`.
    pub action: Option<String>,
    /// Opaque per-key identifier assigned by the host.
    pub context: Option<String>,
    /// Hardware the key lives on. Only logged.
    pub device: Option<String>,
    pub event: HostEvent,
}

impl HostFrame {
    /// Action key: the suffix after the last `.` of the action identifier.
    pub fn action_key(&self) -> Option<&str> {
        self.action
            .as_deref()
            .and_then(|action| action.rsplit('.').next())
            .filter(|key| !key.is_empty())
    }
}

/// Parse one text frame received from the host.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the text is not a JSON object with a string
/// `event` field.
pub fn parse_host_frame(text: &str) -> Result<HostFrame> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| Error::parse(format!("{e}")))?;

    let event = parse_event(&raw.event, raw.payload);
    Ok(HostFrame {
        action: raw.action,
        context: raw.context,
        device: raw.device,
        event,
    })
}

/// Interpret an event by name
fn parse_event(event: &str, payload: Value) -> HostEvent {
    match event {
        "willAppear" => HostEvent::WillAppear {
            settings: settings_of(&payload),
        },
        "didReceiveSettings" => HostEvent::DidReceiveSettings {
            settings: settings_of(&payload),
        },
        "willDisappear" => HostEvent::WillDisappear,
        "keyDown" => HostEvent::KeyDown,
        "keyUp" => HostEvent::KeyUp,
        "sendToPlugin" => HostEvent::SendToPlugin { payload },
        "propertyInspectorDidAppear" => HostEvent::PropertyInspectorDidAppear,
        "propertyInspectorDidDisappear" => HostEvent::PropertyInspectorDidDisappear,
        "didReceiveGlobalSettings" => HostEvent::DidReceiveGlobalSettings {
            settings: settings_of(&payload),
        },
        "systemDidWakeUp" => HostEvent::SystemDidWakeUp,
        other => HostEvent::Unknown {
            event: other.to_string(),
        },
    }
}

fn settings_of(payload: &Value) -> Option<Value> {
    payload.get("settings").filter(|s| !s.is_null()).cloned()
}

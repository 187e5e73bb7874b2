//! Button actions.
//!
//! Each action the plugin registers with the host is identified by the last
//! dot-separated segment of its action id (`com.example.homedeck.control` ->
//! `control`). [`ActionKind`] is the closed set of known keys; the dispatcher
//! maps each kind to its [`ActionHandler`].

use serde_json::Value;

pub mod control;

pub use control::ControlAction;

/// Known action keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Run a scenario or toggle a device.
    Control,
}

impl ActionKind {
    pub const ALL: [ActionKind; 1] = [ActionKind::Control];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "control" => Some(Self::Control),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Control => "control",
        }
    }
}

/// Per-key event callbacks of one action.
///
/// Every method runs synchronously inside dispatch and must not block; any
/// network work is spawned. Events an action does not care about keep the
/// default no-op.
pub trait ActionHandler: Send + Sync {
    fn will_appear(&self, _context: &str, _settings: Option<&Value>) {}

    fn did_receive_settings(&self, _context: &str, _settings: Option<&Value>) {}

    fn will_disappear(&self, _context: &str) {}

    fn key_down(&self, _context: &str) {}

    fn key_up(&self, _context: &str) {}

    fn send_to_plugin(&self, _action: Option<&str>, _context: &str, _payload: &Value) {}

    fn property_inspector_did_appear(&self, _context: &str) {}

    /// Re-read live state for every key (after the system wakes up).
    fn refresh_all(&self) {}
}

//! Outbound commands and the clonable sender used by every handler.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use homedeck_core::prelude::*;

/// Commands the plugin can send to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    SetTitle {
        context: String,
        title: String,
    },
    /// `image` is a `data:` URI.
    SetImage {
        context: String,
        image: String,
    },
    /// 0 = off, 1 = on.
    SetState {
        context: String,
        state: u8,
    },
    SetSettings {
        context: String,
        settings: Value,
    },
    ShowAlert {
        context: String,
    },
    ShowOk {
        context: String,
    },
    SendToPropertyInspector {
        action: Option<String>,
        context: String,
        payload: Value,
    },
    /// Global settings are addressed with the plugin uuid.
    GetGlobalSettings {
        context: String,
    },
    SetGlobalSettings {
        context: String,
        settings: Value,
    },
    OpenUrl {
        url: String,
    },
}

impl HostCommand {
    /// Request for the process-wide settings, addressed with the plugin uuid.
    pub fn get_global_settings(plugin_uuid: &str) -> Self {
        Self::GetGlobalSettings {
            context: plugin_uuid.to_string(),
        }
    }

    /// Wire event name of this command.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SetTitle { .. } => "setTitle",
            Self::SetImage { .. } => "setImage",
            Self::SetState { .. } => "setState",
            Self::SetSettings { .. } => "setSettings",
            Self::ShowAlert { .. } => "showAlert",
            Self::ShowOk { .. } => "showOk",
            Self::SendToPropertyInspector { .. } => "sendToPropertyInspector",
            Self::GetGlobalSettings { .. } => "getGlobalSettings",
            Self::SetGlobalSettings { .. } => "setGlobalSettings",
            Self::OpenUrl { .. } => "openUrl",
        }
    }

    /// The key context this command targets, if any.
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::SetTitle { context, .. }
            | Self::SetImage { context, .. }
            | Self::SetState { context, .. }
            | Self::SetSettings { context, .. }
            | Self::ShowAlert { context }
            | Self::ShowOk { context }
            | Self::SendToPropertyInspector { context, .. }
            | Self::GetGlobalSettings { context }
            | Self::SetGlobalSettings { context, .. } => Some(context),
            Self::OpenUrl { .. } => None,
        }
    }

    /// Serialize to the JSON object written on the wire.
    pub fn to_frame(&self) -> Value {
        let event = self.event_name();
        match self {
            Self::SetTitle { context, title } => json!({
                "event": event,
                "context": context,
                "payload": { "target": 0, "title": title },
            }),
            Self::SetImage { context, image } => json!({
                "event": event,
                "context": context,
                "payload": { "target": 0, "image": image },
            }),
            Self::SetState { context, state } => json!({
                "event": event,
                "context": context,
                "payload": { "state": state },
            }),
            Self::SetSettings { context, settings }
            | Self::SetGlobalSettings { context, settings } => json!({
                "event": event,
                "context": context,
                "payload": settings,
            }),
            Self::ShowAlert { context }
            | Self::ShowOk { context }
            | Self::GetGlobalSettings { context } => json!({
                "event": event,
                "context": context,
            }),
            Self::SendToPropertyInspector {
                action,
                context,
                payload,
            } => json!({
                "event": event,
                "action": action,
                "context": context,
                "payload": payload,
            }),
            Self::OpenUrl { url } => json!({
                "event": event,
                "payload": { "url": url },
            }),
        }
    }
}

/// One-time registration frame sent right after connecting.
pub fn registration_frame(plugin_uuid: &str, register_event: &str) -> Value {
    json!({ "uuid": plugin_uuid, "event": register_event })
}

/// A clonable handle for sending commands to the host.
///
/// All handles share the transport's outbound queue. Sending never blocks
/// and never waits for an acknowledgement; once the connection is gone the
/// commands are dropped with a debug log.
#[derive(Clone)]
pub struct HostSender {
    cmd_tx: mpsc::UnboundedSender<HostCommand>,
    plugin_uuid: Arc<str>,
}

impl std::fmt::Debug for HostSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSender")
            .field("plugin_uuid", &self.plugin_uuid)
            .field("closed", &self.cmd_tx.is_closed())
            .finish()
    }
}

impl HostSender {
    pub(crate) fn new(cmd_tx: mpsc::UnboundedSender<HostCommand>, plugin_uuid: &str) -> Self {
        Self {
            cmd_tx,
            plugin_uuid: Arc::from(plugin_uuid),
        }
    }

    /// Create a sender whose commands are collected by the returned receiver.
    ///
    /// Intended for handler tests that assert on the commands a handler emits.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn new_for_test(plugin_uuid: &str) -> (Self, mpsc::UnboundedReceiver<HostCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        (Self::new(cmd_tx, plugin_uuid), cmd_rx)
    }

    pub fn plugin_uuid(&self) -> &str {
        &self.plugin_uuid
    }

    /// Queue a command for the host.
    pub fn send(&self, command: HostCommand) {
        trace!("-> host: {} ({:?})", command.event_name(), command.context());
        if let Err(err) = self.cmd_tx.send(command) {
            debug!(
                "Host connection gone, dropping {}",
                err.0.event_name()
            );
        }
    }

    pub fn set_title(&self, context: &str, title: impl Into<String>) {
        self.send(HostCommand::SetTitle {
            context: context.to_string(),
            title: title.into(),
        });
    }

    pub fn set_image(&self, context: &str, image: impl Into<String>) {
        self.send(HostCommand::SetImage {
            context: context.to_string(),
            image: image.into(),
        });
    }

    pub fn set_state(&self, context: &str, state: u8) {
        self.send(HostCommand::SetState {
            context: context.to_string(),
            state,
        });
    }

    pub fn set_settings(&self, context: &str, settings: Value) {
        info!("Persisting settings for context {}", context);
        self.send(HostCommand::SetSettings {
            context: context.to_string(),
            settings,
        });
    }

    pub fn show_alert(&self, context: &str) {
        self.send(HostCommand::ShowAlert {
            context: context.to_string(),
        });
    }

    pub fn show_ok(&self, context: &str) {
        self.send(HostCommand::ShowOk {
            context: context.to_string(),
        });
    }

    pub fn send_to_property_inspector(
        &self,
        action: Option<&str>,
        context: &str,
        payload: Value,
    ) {
        debug!("Sending to property inspector of {}", context);
        self.send(HostCommand::SendToPropertyInspector {
            action: action.map(str::to_string),
            context: context.to_string(),
            payload,
        });
    }

    pub fn set_global_settings(&self, settings: Value) {
        info!("Persisting global settings");
        self.send(HostCommand::SetGlobalSettings {
            context: self.plugin_uuid.to_string(),
            settings,
        });
    }

    pub fn open_url(&self, url: impl Into<String>) {
        self.send(HostCommand::OpenUrl { url: url.into() });
    }
}

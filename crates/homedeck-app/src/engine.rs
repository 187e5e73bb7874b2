//! Frame dispatcher.
//!
//! For every inbound frame three independent steps run, in this order:
//!
//! 1. the action handler for the frame's action key gets the per-key event;
//! 2. `didReceiveGlobalSettings` overwrites the global settings cache;
//! 3. process-wide handlers run (`propertyInspectorDidAppear` moves the
//!    inspector focus, `systemDidWakeUp` refreshes every device key).
//!
//! Unknown action keys and unknown events are ignored.

use serde_json::Value;
use tokio::sync::mpsc;

use homedeck_cloud::SmartHomeApi;
use homedeck_core::prelude::*;
use homedeck_core::GlobalSettings;
use homedeck_host::{HostEvent, HostFrame};

use crate::actions::{ActionHandler, ActionKind, ControlAction};
use crate::context::{InspectorTarget, PluginContext};

pub struct Engine<A> {
    ctx: PluginContext<A>,
    control: ControlAction<A>,
}

impl<A> Engine<A>
where
    A: SmartHomeApi + Send + Sync + 'static,
{
    pub fn new(ctx: PluginContext<A>) -> Self {
        let control = ControlAction::new(ctx.clone());
        Self { ctx, control }
    }

    pub fn context(&self) -> &PluginContext<A> {
        &self.ctx
    }

    pub fn control(&self) -> &ControlAction<A> {
        &self.control
    }

    fn handler(&self, kind: ActionKind) -> &dyn ActionHandler {
        match kind {
            ActionKind::Control => &self.control,
        }
    }

    /// Handle one frame. Never blocks; network work is spawned.
    pub fn dispatch(&self, frame: &HostFrame) {
        trace!(
            "Dispatching {} for {:?} ({:?}, device {:?})",
            frame.event.name(),
            frame.action,
            frame.context,
            frame.device
        );

        match frame.action_key().map(|key| (key, ActionKind::from_key(key))) {
            Some((_, Some(kind))) => self.route_to_action(kind, frame),
            Some((key, None)) => debug!("No handler for action key {:?}", key),
            None => {}
        }

        if let HostEvent::DidReceiveGlobalSettings { settings } = &frame.event {
            self.overwrite_globals(settings.as_ref());
        }

        match &frame.event {
            HostEvent::PropertyInspectorDidAppear => {
                if let Some(context) = &frame.context {
                    self.ctx.focus.set(InspectorTarget {
                        action: frame.action.clone(),
                        context: context.clone(),
                    });
                }
            }
            HostEvent::SystemDidWakeUp => {
                info!("System woke up, refreshing device keys");
                for kind in ActionKind::ALL {
                    self.handler(kind).refresh_all();
                }
            }
            HostEvent::Unknown { event } => debug!("Ignoring unknown event {:?}", event),
            _ => {}
        }
    }

    fn route_to_action(&self, kind: ActionKind, frame: &HostFrame) {
        let Some(context) = frame.context.as_deref() else {
            debug!("{} for {} without context", frame.event.name(), kind.key());
            return;
        };
        let handler = self.handler(kind);

        match &frame.event {
            HostEvent::WillAppear { settings } => handler.will_appear(context, settings.as_ref()),
            HostEvent::DidReceiveSettings { settings } => {
                handler.did_receive_settings(context, settings.as_ref())
            }
            HostEvent::WillDisappear => handler.will_disappear(context),
            HostEvent::KeyDown => handler.key_down(context),
            HostEvent::KeyUp => handler.key_up(context),
            HostEvent::SendToPlugin { payload } => {
                handler.send_to_plugin(frame.action.as_deref(), context, payload)
            }
            HostEvent::PropertyInspectorDidAppear => handler.property_inspector_did_appear(context),
            HostEvent::PropertyInspectorDidDisappear
            | HostEvent::DidReceiveGlobalSettings { .. }
            | HostEvent::SystemDidWakeUp
            | HostEvent::Unknown { .. } => {}
        }
    }

    fn overwrite_globals(&self, settings: Option<&Value>) {
        let globals = GlobalSettings::from_payload(settings);
        info!(
            "Global settings received (token {})",
            if globals.token().is_some() { "set" } else { "missing" }
        );
        self.ctx.globals.replace(globals);
    }

    /// Dispatch frames until the host connection goes away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the frame stream ends; the
    /// plugin cannot do anything useful without its host.
    pub async fn run(&self, events: &mut mpsc::Receiver<HostFrame>) -> Result<()> {
        info!("Dispatcher running");
        while let Some(frame) = events.recv().await {
            self.dispatch(&frame);
        }
        warn!("Host connection lost");
        Err(Error::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use homedeck_host::{parse_host_frame, HostCommand, HostSender};

    use crate::testing::{ApiCall, FakeSmartHome};

    const ACTION: &str = "com.example.homedeck.control";

    fn engine(
        api: FakeSmartHome,
    ) -> (
        Engine<FakeSmartHome>,
        Arc<FakeSmartHome>,
        mpsc::UnboundedReceiver<HostCommand>,
    ) {
        let (sender, rx) = HostSender::new_for_test("PLUGIN");
        let api = Arc::new(api);
        let ctx = PluginContext::new(sender, Arc::clone(&api), Duration::from_secs(10));
        (Engine::new(ctx), api, rx)
    }

    fn frame(value: Value) -> HostFrame {
        parse_host_frame(&value.to_string()).unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<HostCommand>) -> Vec<HostCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_settings_overwrite_cache() {
        let (engine, _api, _rx) = engine(FakeSmartHome::new());
        engine.dispatch(&frame(json!({
            "event": "didReceiveGlobalSettings",
            "payload": {"settings": {"token": "T1"}}
        })));
        assert_eq!(engine.context().globals.token().as_deref(), Some("T1"));

        engine.dispatch(&frame(json!({
            "event": "didReceiveGlobalSettings",
            "payload": {"settings": {}}
        })));
        assert_eq!(engine.context().globals.token(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_action_and_event_are_ignored() {
        let (engine, api, mut rx) = engine(FakeSmartHome::new());
        engine.dispatch(&frame(json!({
            "event": "willAppear",
            "action": "com.example.homedeck.dimmer",
            "context": "C1",
            "payload": {"settings": {"type": "device", "objectId": "D"}}
        })));
        engine.dispatch(&frame(json!({
            "event": "titleParametersDidChange",
            "action": ACTION,
            "context": "C1"
        })));
        engine.dispatch(&frame(json!({"event": "keyDown", "action": ACTION, "context": "C9"})));
        settle().await;

        assert!(engine.control().buttons().is_empty());
        assert!(drain(&mut rx).is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inspector_focus_tracks_latest_appear() {
        let (engine, _api, _rx) = engine(FakeSmartHome::new());
        for context in ["C1", "C2"] {
            engine.dispatch(&frame(json!({
                "event": "propertyInspectorDidAppear",
                "action": ACTION,
                "context": context
            })));
        }
        assert_eq!(
            engine.context().focus.get(),
            Some(InspectorTarget {
                action: Some(ACTION.into()),
                context: "C2".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_flow_through_dispatch() {
        let (engine, api, mut rx) =
            engine(FakeSmartHome::new().with_device("D", "devices.types.socket", false));

        engine.dispatch(&frame(json!({
            "event": "didReceiveGlobalSettings",
            "payload": {"settings": {"token": "T"}}
        })));
        engine.dispatch(&frame(json!({
            "event": "willAppear",
            "action": ACTION,
            "context": "C1",
            "payload": {"settings": {"type": "device", "objectId": "D"}}
        })));
        settle().await;
        drain(&mut rx);

        engine.dispatch(&frame(json!({"event": "keyUp", "action": ACTION, "context": "C1"})));
        settle().await;

        assert!(api.calls().contains(&ApiCall::SetDeviceOnOff {
            token: "T".into(),
            device_id: "D".into(),
            on: true
        }));
        let commands = drain(&mut rx);
        assert!(commands.contains(&HostCommand::SetState {
            context: "C1".into(),
            state: 1
        }));
        assert!(!commands
            .iter()
            .any(|c| matches!(c, HostCommand::ShowAlert { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_up_refreshes_device_keys() {
        let (engine, api, _rx) =
            engine(FakeSmartHome::new().with_device("D", "devices.types.light", true));
        engine.dispatch(&frame(json!({
            "event": "didReceiveGlobalSettings",
            "payload": {"settings": {"token": "T"}}
        })));
        engine.dispatch(&frame(json!({
            "event": "willAppear",
            "action": ACTION,
            "context": "C1",
            "payload": {"settings": {"type": "device", "objectId": "D"}}
        })));
        settle().await;
        assert_eq!(api.device_reads(), 1);

        engine.dispatch(&frame(json!({"event": "systemDidWakeUp"})));
        settle().await;
        assert_eq!(api.device_reads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ends_with_connection_closed() {
        let (engine, _api, _rx) = engine(FakeSmartHome::new());
        let (tx, mut events) = mpsc::channel(8);
        tx.send(frame(json!({
            "event": "willAppear",
            "action": ACTION,
            "context": "C1"
        })))
        .await
        .unwrap();
        drop(tx);

        let err = engine.run(&mut events).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(engine.control().buttons().len(), 1);
    }
}

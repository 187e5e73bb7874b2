//! The `control` action: a key bound to a scenario or to a switchable device.
//!
//! Lifecycle of one key (identified by its host context):
//!
//! - `willAppear` seeds the settings. A device-bound key gets the neutral
//!   icon, an immediate refresh and a [`PollTask`].
//! - Settings updates (from the host or the property inspector) replace or
//!   merge the settings and start/stop the poll task to match the binding.
//! - `willDisappear` drops the key, which aborts its poll task.
//!
//! Network work always runs in a spawned task. Before touching the key's
//! visuals such a task checks that the key still exists (and, for state
//! refreshes, is still bound to the same device), so a late response never
//! paints a key that went away.

use serde_json::{Map, Value};

use homedeck_cloud::SmartHomeApi;
use homedeck_core::prelude::*;
use homedeck_core::{device_icon, unknown_device_icon, BindingType, ButtonSettings, DeviceState};

use crate::button::{ButtonInstance, ButtonRegistry};
use crate::context::{InspectorTarget, PluginContext};
use crate::inspector::{self, InspectorMessage};
use crate::poll::PollTask;

use super::ActionHandler;

/// What a validated key press will do.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Press {
    binding: BindingType,
    token: String,
    target: String,
}

pub struct ControlAction<A> {
    ctx: PluginContext<A>,
    buttons: ButtonRegistry,
}

impl<A> Clone for ControlAction<A> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            buttons: self.buttons.clone(),
        }
    }
}

impl<A> ControlAction<A>
where
    A: SmartHomeApi + Send + Sync + 'static,
{
    pub fn new(ctx: PluginContext<A>) -> Self {
        Self {
            ctx,
            buttons: ButtonRegistry::default(),
        }
    }

    pub fn buttons(&self) -> &ButtonRegistry {
        &self.buttons
    }

    // ─────────────────────────────────────────────────────────────
    // State refresh
    // ─────────────────────────────────────────────────────────────

    /// Read the live state of the key's device and paint it.
    ///
    /// Silently does nothing when the key is gone, not device-bound, has no
    /// device selected, or no token is configured. Failures are logged only.
    pub async fn refresh(&self, context: &str) {
        let Some(settings) = self.buttons.settings(context) else {
            return;
        };
        if !settings.is_device() {
            return;
        }
        let Some(device_id) = settings.target_id().map(str::to_string) else {
            return;
        };
        let Some(token) = self.ctx.globals.token() else {
            return;
        };

        match self.ctx.api.read_device_state(&token, &device_id).await {
            Ok(Some(state)) => {
                let buttons = self.buttons.lock();
                match buttons.get(context) {
                    Some(button) if button.is_bound_to_device(&device_id) => {
                        self.show_state(context, &state);
                    }
                    _ => debug!("Dropping state of {} for departed key {}", device_id, context),
                }
            }
            Ok(None) => debug!("Device {} has no on/off state", device_id),
            Err(e) => warn!("Failed to update device state for {}: {}", context, e),
        }
    }

    fn spawn_refresh(&self, context: &str) {
        let action = self.clone();
        let context = context.to_string();
        tokio::spawn(async move {
            action.refresh(&context).await;
        });
    }

    fn spawn_poll(&self, context: &str) -> PollTask {
        let action = self.clone();
        let key = context.to_string();
        PollTask::spawn(context, self.ctx.poll_interval, move || {
            let action = action.clone();
            let context = key.clone();
            async move {
                action.refresh(&context).await;
            }
        })
    }

    /// Start or stop polling so that it runs exactly while device-bound.
    fn reconcile_poll(&self, context: &str, button: &mut ButtonInstance) {
        match (button.settings.is_device(), button.poll.is_some()) {
            (true, false) => {
                debug!("Starting state polling for {}", context);
                button.poll = Some(self.spawn_poll(context));
            }
            (false, true) => {
                debug!("Stopping state polling for {}", context);
                button.poll = None;
            }
            _ => {}
        }
    }

    fn show_state(&self, context: &str, state: &DeviceState) {
        self.ctx.sender.set_state(context, state.host_state());
        self.ctx
            .sender
            .set_image(context, device_icon(&state.device_type, state.is_on));
    }

    // ─────────────────────────────────────────────────────────────
    // Key press
    // ─────────────────────────────────────────────────────────────

    fn validate_press(&self, context: &str) -> Result<Press> {
        let settings = self
            .buttons
            .settings(context)
            .ok_or(Error::MissingTarget)?;
        let token = self.ctx.globals.token().ok_or(Error::MissingCredential)?;
        let target = settings.target_id().ok_or(Error::MissingTarget)?;
        Ok(Press {
            binding: settings.binding,
            token,
            target: target.to_string(),
        })
    }

    async fn execute(&self, context: &str, press: Press) {
        let result = match press.binding {
            BindingType::Scenario => {
                info!("Executing scenario {}", press.target);
                self.ctx
                    .api
                    .run_scenario(&press.token, &press.target)
                    .await
                    .map(|()| None)
            }
            BindingType::Device => {
                info!("Toggling device {}", press.target);
                self.toggle(&press.token, &press.target).await.map(Some)
            }
        };

        let buttons = self.buttons.lock();
        if !buttons.contains_key(context) {
            debug!("Key {} disappeared before its press completed", context);
            return;
        }
        match result {
            Ok(None) => self.ctx.sender.show_ok(context),
            Ok(Some(state)) => self.show_state(context, &state),
            Err(e) => {
                error!("Failed to execute action for {}: {}", press.target, e);
                self.ctx.sender.show_alert(context);
            }
        }
    }

    /// Read, negate, write. Returns the new state.
    async fn toggle(&self, token: &str, device_id: &str) -> Result<DeviceState> {
        let current = self
            .ctx
            .api
            .read_device_state(token, device_id)
            .await?
            .ok_or_else(|| Error::unsupported_device(device_id))?;
        let desired = !current.is_on;
        self.ctx
            .api
            .set_device_on_off(token, device_id, desired)
            .await?;
        Ok(DeviceState {
            is_on: desired,
            device_type: current.device_type,
        })
    }

    // ─────────────────────────────────────────────────────────────
    // Property inspector
    // ─────────────────────────────────────────────────────────────

    fn update_settings(&self, context: &str, patch: &Map<String, Value>) {
        let merged = {
            let mut buttons = self.buttons.lock();
            let Some(button) = buttons.get_mut(context) else {
                warn!("Settings update for unknown key {}", context);
                return;
            };
            match button.settings.merged(patch) {
                Ok(merged) => {
                    button.settings = merged.clone();
                    self.reconcile_poll(context, button);
                    merged
                }
                Err(e) => {
                    warn!("Rejected settings update for {}: {}", context, e);
                    return;
                }
            }
        };

        self.ctx.sender.set_settings(context, merged.to_value());
        if merged.is_device() {
            self.spawn_refresh(context);
        }
    }

    fn fetch_data(&self, action: Option<&str>, context: &str, token: Option<String>) {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| self.ctx.globals.token());
        let target = self.ctx.focus.get().unwrap_or_else(|| InspectorTarget {
            action: action.map(str::to_string),
            context: context.to_string(),
        });

        let Some(token) = token else {
            warn!("Cannot fetch account data without a token");
            self.ctx.sender.send_to_property_inspector(
                target.action.as_deref(),
                &target.context,
                inspector::error_message(Error::MissingCredential),
            );
            return;
        };

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            info!("Fetching account data for the property inspector");
            let payload = match ctx.api.fetch_account_info(&token).await {
                Ok(Some(info)) => inspector::data_list(&info),
                Ok(None) => inspector::error_message("Empty response from the smart-home API"),
                Err(e) => {
                    error!("Failed to fetch account data: {}", e);
                    inspector::error_message(e)
                }
            };
            ctx.sender
                .send_to_property_inspector(target.action.as_deref(), &target.context, payload);
        });
    }

    fn save_token(&self, token: String) {
        let updated = self.ctx.globals.set_token(token);
        self.ctx.sender.set_global_settings(updated.to_value());
    }
}

impl<A> ActionHandler for ControlAction<A>
where
    A: SmartHomeApi + Send + Sync + 'static,
{
    fn will_appear(&self, context: &str, settings: Option<&Value>) {
        let settings = ButtonSettings::from_host(settings);
        info!(
            "Control key appeared: {} ({:?} {:?})",
            context, settings.binding, settings.object_id
        );

        let is_device = settings.is_device();
        let mut button = ButtonInstance::new(settings);
        if is_device {
            self.ctx.sender.set_image(context, unknown_device_icon());
            button.poll = Some(self.spawn_poll(context));
        }

        // The replaced record (and its poll task) is dropped here.
        let _previous = self.buttons.insert(context, button);

        if is_device {
            self.spawn_refresh(context);
        }
    }

    fn did_receive_settings(&self, context: &str, settings: Option<&Value>) {
        let settings = ButtonSettings::from_host(settings);
        let mut buttons = self.buttons.lock();
        match buttons.get_mut(context) {
            Some(button) => {
                debug!("Host settings for {}: {:?}", context, settings);
                button.settings = settings;
                self.reconcile_poll(context, button);
            }
            None => debug!("Host settings for unknown key {}", context),
        }
    }

    fn will_disappear(&self, context: &str) {
        info!("Control key disappeared: {}", context);
        drop(self.buttons.remove(context));
    }

    fn key_up(&self, context: &str) {
        let press = match self.validate_press(context) {
            Ok(press) => press,
            Err(e) => {
                warn!("Settings missing for {}: {}", context, e);
                self.ctx.sender.show_alert(context);
                return;
            }
        };

        let action = self.clone();
        let context = context.to_string();
        tokio::spawn(async move {
            action.execute(&context, press).await;
        });
    }

    fn send_to_plugin(&self, action: Option<&str>, context: &str, payload: &Value) {
        match InspectorMessage::from_payload(payload) {
            InspectorMessage::UpdateSettings { settings } => self.update_settings(context, &settings),
            InspectorMessage::FetchData { token } => self.fetch_data(action, context, token),
            InspectorMessage::SaveToken { token } => self.save_token(token),
            InspectorMessage::OpenUrl { url } => self.ctx.sender.open_url(url),
            InspectorMessage::Unknown => {
                let kind = payload.get("type").and_then(Value::as_str);
                debug!("Ignoring inspector message {:?}", kind);
            }
        }
    }

    fn refresh_all(&self) {
        for context in self.buttons.device_contexts() {
            self.spawn_refresh(&context);
        }
    }
}

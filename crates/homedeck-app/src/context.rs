//! Process-wide state shared by every action handler.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use homedeck_core::prelude::*;
use homedeck_core::GlobalSettings;
use homedeck_host::HostSender;

/// Cached account-wide settings.
///
/// Written whenever the host pushes global settings (including the reply to
/// the startup request) and read by handlers at the moment they need the
/// token, never captured earlier.
#[derive(Debug, Clone, Default)]
pub struct GlobalSettingsCache(Arc<RwLock<GlobalSettings>>);

impl GlobalSettingsCache {
    pub fn get(&self) -> GlobalSettings {
        match self.0.read() {
            Ok(settings) => settings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Overwrite the cache wholesale.
    pub fn replace(&self, settings: GlobalSettings) {
        match self.0.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    /// Set the token, keeping every other key. Returns the updated settings.
    pub fn set_token(&self, token: impl Into<String>) -> GlobalSettings {
        let mut settings = self.get();
        settings.token = Some(token.into());
        self.replace(settings.clone());
        settings
    }

    /// The current non-empty token.
    pub fn token(&self) -> Option<String> {
        self.get().token().map(str::to_string)
    }
}

/// The key whose property inspector was opened most recently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorTarget {
    pub action: Option<String>,
    pub context: String,
}

/// Last-shown property inspector, used as the destination for data pushes.
#[derive(Debug, Clone, Default)]
pub struct InspectorFocus(Arc<RwLock<Option<InspectorTarget>>>);

impl InspectorFocus {
    pub fn get(&self) -> Option<InspectorTarget> {
        match self.0.read() {
            Ok(target) => target.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, target: InspectorTarget) {
        debug!("Inspector focus -> {}", target.context);
        match self.0.write() {
            Ok(mut guard) => *guard = Some(target),
            Err(poisoned) => *poisoned.into_inner() = Some(target),
        }
    }
}

/// Everything a handler needs to talk to the host and the cloud.
pub struct PluginContext<A> {
    pub sender: HostSender,
    pub api: Arc<A>,
    pub globals: GlobalSettingsCache,
    pub focus: InspectorFocus,
    pub poll_interval: Duration,
}

impl<A> PluginContext<A> {
    pub fn new(sender: HostSender, api: Arc<A>, poll_interval: Duration) -> Self {
        Self {
            sender,
            api,
            globals: GlobalSettingsCache::default(),
            focus: InspectorFocus::default(),
            poll_interval,
        }
    }
}

// Manual impl: `A` itself is behind an `Arc` and need not be `Clone`.
impl<A> Clone for PluginContext<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            api: Arc::clone(&self.api),
            globals: self.globals.clone(),
            focus: self.focus.clone(),
            poll_interval: self.poll_interval,
        }
    }
}

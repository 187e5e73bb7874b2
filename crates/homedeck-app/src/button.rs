//! Per-key state: settings plus the optional poll task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use homedeck_core::ButtonSettings;

use crate::poll::PollTask;

/// One visible key bound to an action.
#[derive(Debug, Default)]
pub struct ButtonInstance {
    pub settings: ButtonSettings,
    /// Running only while the key is bound to a device.
    pub poll: Option<PollTask>,
}

impl ButtonInstance {
    pub fn new(settings: ButtonSettings) -> Self {
        Self {
            settings,
            poll: None,
        }
    }

    /// Whether this key is still bound to device `device_id`.
    pub fn is_bound_to_device(&self, device_id: &str) -> bool {
        self.settings.is_device() && self.settings.target_id() == Some(device_id)
    }
}

/// Visible keys of one action, keyed by host context.
///
/// The lock is only ever held for short synchronous sections, never across
/// an `.await`.
#[derive(Debug, Clone, Default)]
pub struct ButtonRegistry {
    buttons: Arc<Mutex<HashMap<String, ButtonInstance>>>,
}

impl ButtonRegistry {
    pub fn lock(&self) -> MutexGuard<'_, HashMap<String, ButtonInstance>> {
        match self.buttons.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert or replace; a replaced instance is returned so the caller can
    /// drop it (and its poll task) outside the lock.
    pub fn insert(&self, context: &str, instance: ButtonInstance) -> Option<ButtonInstance> {
        self.lock().insert(context.to_string(), instance)
    }

    pub fn remove(&self, context: &str) -> Option<ButtonInstance> {
        self.lock().remove(context)
    }

    pub fn contains(&self, context: &str) -> bool {
        self.lock().contains_key(context)
    }

    pub fn settings(&self, context: &str) -> Option<ButtonSettings> {
        self.lock().get(context).map(|b| b.settings.clone())
    }

    /// Contexts of every key currently bound to a device.
    pub fn device_contexts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, b)| b.settings.is_device())
            .map(|(context, _)| context.clone())
            .collect()
    }

    pub fn has_poll_task(&self, context: &str) -> bool {
        self.lock()
            .get(context)
            .and_then(|b| b.poll.as_ref())
            .is_some_and(|poll| !poll.is_finished())
    }

    /// Number of live poll tasks across all keys.
    pub fn poll_task_count(&self) -> usize {
        self.lock()
            .values()
            .filter_map(|b| b.poll.as_ref())
            .filter(|poll| !poll.is_finished())
            .count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homedeck_core::BindingType;

    fn device(id: &str) -> ButtonSettings {
        ButtonSettings {
            binding: BindingType::Device,
            object_id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_returns_replaced_instance() {
        let registry = ButtonRegistry::default();
        assert!(registry.insert("C1", ButtonInstance::default()).is_none());
        assert!(registry.insert("C1", ButtonInstance::new(device("D"))).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.settings("C1").unwrap().is_device());
    }

    #[test]
    fn test_device_contexts_skips_scenarios() {
        let registry = ButtonRegistry::default();
        registry.insert("C1", ButtonInstance::new(device("D")));
        registry.insert("C2", ButtonInstance::default());
        assert_eq!(registry.device_contexts(), vec!["C1".to_string()]);
    }

    #[test]
    fn test_is_bound_to_device() {
        let instance = ButtonInstance::new(device("D"));
        assert!(instance.is_bound_to_device("D"));
        assert!(!instance.is_bound_to_device("E"));
        assert!(!ButtonInstance::default().is_bound_to_device(""));
    }

    #[test]
    fn test_remove() {
        let registry = ButtonRegistry::default();
        registry.insert("C1", ButtonInstance::default());
        assert!(registry.remove("C1").is_some());
        assert!(registry.remove("C1").is_none());
        assert!(registry.is_empty());
    }
}

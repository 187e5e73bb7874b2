//! In-memory [`SmartHomeApi`] for handler tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use homedeck_cloud::{AccountInfo, SmartHomeApi};
use homedeck_core::prelude::*;
use homedeck_core::DeviceState;

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FetchAccountInfo { token: String },
    RunScenario { token: String, scenario_id: String },
    ReadDeviceState { token: String, device_id: String },
    SetDeviceOnOff { token: String, device_id: String, on: bool },
}

/// Fake cloud: devices live in a map, every call is recorded.
#[derive(Debug, Default)]
pub struct FakeSmartHome {
    calls: Mutex<Vec<ApiCall>>,
    devices: Mutex<HashMap<String, DeviceState>>,
    account: Mutex<Option<AccountInfo>>,
    failure: Mutex<Option<u16>>,
    read_delay: Mutex<Option<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeSmartHome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a switchable device.
    pub fn with_device(self, id: &str, device_type: &str, is_on: bool) -> Self {
        lock(&self.devices).insert(
            id.to_string(),
            DeviceState {
                is_on,
                device_type: device_type.to_string(),
            },
        );
        self
    }

    pub fn with_account(self, account: AccountInfo) -> Self {
        *lock(&self.account) = Some(account);
        self
    }

    /// Make every call fail with this HTTP status.
    pub fn fail_with(&self, status: u16) {
        *lock(&self.failure) = Some(status);
    }

    /// Delay device state reads (use with paused time).
    pub fn set_read_delay(&self, delay: Duration) {
        *lock(&self.read_delay) = Some(delay);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    pub fn device_reads(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ApiCall::ReadDeviceState { .. }))
            .count()
    }

    pub fn is_on(&self, id: &str) -> Option<bool> {
        lock(&self.devices).get(id).map(|d| d.is_on)
    }

    fn record(&self, call: ApiCall) -> Result<()> {
        lock(&self.calls).push(call);
        match *lock(&self.failure) {
            Some(status) => Err(Error::http_status(status, "fake failure")),
            None => Ok(()),
        }
    }
}

impl SmartHomeApi for FakeSmartHome {
    async fn fetch_account_info(&self, token: &str) -> Result<Option<AccountInfo>> {
        self.record(ApiCall::FetchAccountInfo {
            token: token.to_string(),
        })?;
        Ok(lock(&self.account).clone())
    }

    async fn run_scenario(&self, token: &str, scenario_id: &str) -> Result<()> {
        self.record(ApiCall::RunScenario {
            token: token.to_string(),
            scenario_id: scenario_id.to_string(),
        })
    }

    async fn read_device_state(
        &self,
        token: &str,
        device_id: &str,
    ) -> Result<Option<DeviceState>> {
        let delay = *lock(&self.read_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(ApiCall::ReadDeviceState {
            token: token.to_string(),
            device_id: device_id.to_string(),
        })?;
        Ok(lock(&self.devices).get(device_id).cloned())
    }

    async fn set_device_on_off(&self, token: &str, device_id: &str, on: bool) -> Result<()> {
        self.record(ApiCall::SetDeviceOnOff {
            token: token.to_string(),
            device_id: device_id.to_string(),
            on,
        })?;
        if let Some(device) = lock(&self.devices).get_mut(device_id) {
            device.is_on = on;
        }
        Ok(())
    }
}

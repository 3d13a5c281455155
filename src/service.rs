// service.rs
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    devices::{Device, DeviceStatus},
    error::AppError,
    metrics,
    models::{DeviceId, Message, Outcome},
};

/// Owns the registered devices and routes messages to them.
///
/// Identities come from a counter that only moves forward, so an id is never
/// handed out twice, even after [`IotService::unregister`].
pub struct IotService {
    devices: DashMap<DeviceId, Arc<dyn Device>>,
    next_id: AtomicU64,
    command_timeout: Option<Duration>,
}

impl IotService {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            next_id: AtomicU64::new(0),
            command_timeout: None,
        }
    }

    /// Applies `timeout` to every [`IotService::send`].
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn register<D: Device + 'static>(&self, device: D) -> DeviceId {
        self.register_shared(Arc::new(device))
    }

    pub fn register_boxed(&self, device: Box<dyn Device>) -> DeviceId {
        self.register_shared(Arc::from(device))
    }

    fn register_shared(&self, device: Arc<dyn Device>) -> DeviceId {
        let id = DeviceId::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let variant = device.variant();
        self.devices.insert(id, device);
        metrics::record_registration(variant);
        info!(%id, %variant, "Device registered");
        id
    }

    /// Removes a device. Later sends to `id` fail with [`AppError::UnknownDevice`].
    pub fn unregister(&self, id: DeviceId) -> Option<Arc<dyn Device>> {
        let removed = self.devices.remove(&id).map(|(_, device)| device);
        if removed.is_some() {
            info!(%id, "Device unregistered");
        }
        removed
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    /// Registered ids in ascending order.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub async fn status(&self, id: DeviceId) -> Result<DeviceStatus, AppError> {
        let device = self.lookup(id)?;
        Ok(device.status().await)
    }

    #[tracing::instrument(skip(self, message), fields(device = %message.target(), kind = %message.kind()))]
    pub async fn send(&self, message: &Message) -> Result<Outcome, AppError> {
        match self.command_timeout {
            Some(after) => self.send_with_timeout(message, after).await,
            None => self.dispatch(message).await,
        }
    }

    /// Like [`IotService::send`] but gives up after `after`. The device call is dropped on expiry.
    pub async fn send_with_timeout(
        &self,
        message: &Message,
        after: Duration,
    ) -> Result<Outcome, AppError> {
        match tokio::time::timeout(after, self.dispatch(message)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(device = %message.target(), kind = %message.kind(), ?after, "Command timed out");
                let err = AppError::Timeout {
                    id: message.target(),
                    kind: message.kind(),
                    after,
                };
                metrics::record_dispatch(message.kind(), err.code(), after);
                Err(err)
            }
        }
    }

    async fn dispatch(&self, message: &Message) -> Result<Outcome, AppError> {
        let started = Instant::now();
        let result = match self.lookup(message.target()) {
            Ok(device) => device.execute(message.kind(), message.payload()).await,
            Err(e) => Err(e),
        };

        let label = match &result {
            Ok(_) => "ok",
            Err(e) => e.code(),
        };
        metrics::record_dispatch(message.kind(), label, started.elapsed());

        match &result {
            Ok(outcome) => debug!(description = %outcome.description, "Command completed"),
            Err(e) => warn!(error = %e, "Command failed"),
        }
        result
    }

    // The map guard is released before the device is awaited.
    fn lookup(&self, id: DeviceId) -> Result<Arc<dyn Device>, AppError> {
        self.devices
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(AppError::UnknownDevice { id })
    }
}

impl Default for IotService {
    fn default() -> Self {
        Self::new()
    }
}

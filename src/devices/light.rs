// light.rs
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Device, DeviceFactory, DeviceStatus, DeviceVariant, Latency, actuator::Actuator};
use crate::{commands::CommandKind, error::AppError, events::EventSink, models::Outcome};

pub(super) const DEFAULT_LATENCY: Duration = Duration::from_millis(300);

pub struct LightDevice {
    power: RwLock<bool>,
    actuator: Actuator,
}

impl LightDevice {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_latency(Latency::uniform(DEFAULT_LATENCY), sink)
    }

    pub fn with_latency(latency: Latency, sink: Arc<dyn EventSink>) -> Self {
        Self {
            power: RwLock::new(false),
            actuator: Actuator::new(DeviceVariant::Light, latency, sink),
        }
    }
}

#[async_trait]
impl Device for LightDevice {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Light
    }

    async fn handle(&self, kind: CommandKind, _payload: Option<&str>) -> Result<Outcome, AppError> {
        match kind {
            CommandKind::SwitchOn => {
                let outcome = self
                    .actuator
                    .perform(kind, "Switching light on", "Light is on".into())
                    .await;
                *self.power.write().await = true;
                Ok(outcome)
            }
            CommandKind::SwitchOff => {
                let outcome = self
                    .actuator
                    .perform(kind, "Switching light off", "Light is off".into())
                    .await;
                *self.power.write().await = false;
                Ok(outcome)
            }
            _ => Err(super::unsupported(DeviceVariant::Light, kind)),
        }
    }

    async fn status(&self) -> DeviceStatus {
        DeviceStatus::Light {
            power: *self.power.read().await,
        }
    }
}

struct LightFactory;

impl DeviceFactory for LightFactory {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Light
    }

    fn create(&self, latency: Latency, sink: Arc<dyn EventSink>) -> Box<dyn Device> {
        Box::new(LightDevice::with_latency(latency, sink))
    }
}

inventory::submit! {
    &LightFactory as &'static dyn DeviceFactory
}

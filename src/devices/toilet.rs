// toilet.rs
use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use super::{Device, DeviceFactory, DeviceStatus, DeviceVariant, Latency, actuator::Actuator};
use crate::{commands::CommandKind, error::AppError, events::EventSink, models::Outcome};

pub(super) const DEFAULT_LATENCY: Duration = Duration::from_millis(1000);

pub struct ToiletDevice {
    flushes: AtomicU32,
    cleanings: AtomicU32,
    actuator: Actuator,
}

impl ToiletDevice {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_latency(Latency::uniform(DEFAULT_LATENCY), sink)
    }

    pub fn with_latency(latency: Latency, sink: Arc<dyn EventSink>) -> Self {
        Self {
            flushes: AtomicU32::new(0),
            cleanings: AtomicU32::new(0),
            actuator: Actuator::new(DeviceVariant::Toilet, latency, sink),
        }
    }
}

#[async_trait]
impl Device for ToiletDevice {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Toilet
    }

    async fn handle(&self, kind: CommandKind, _payload: Option<&str>) -> Result<Outcome, AppError> {
        match kind {
            CommandKind::Flush => {
                let outcome = self
                    .actuator
                    .perform(kind, "Flushing toilet", "Toilet flushed".into())
                    .await;
                self.flushes.fetch_add(1, Ordering::Relaxed);
                Ok(outcome)
            }
            CommandKind::Clean => {
                let outcome = self
                    .actuator
                    .perform(kind, "Cleaning toilet", "Toilet cleaned".into())
                    .await;
                self.cleanings.fetch_add(1, Ordering::Relaxed);
                Ok(outcome)
            }
            _ => Err(super::unsupported(DeviceVariant::Toilet, kind)),
        }
    }

    async fn status(&self) -> DeviceStatus {
        DeviceStatus::Toilet {
            flushes: self.flushes.load(Ordering::Relaxed),
            cleanings: self.cleanings.load(Ordering::Relaxed),
        }
    }
}

struct ToiletFactory;

impl DeviceFactory for ToiletFactory {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Toilet
    }

    fn create(&self, latency: Latency, sink: Arc<dyn EventSink>) -> Box<dyn Device> {
        Box::new(ToiletDevice::with_latency(latency, sink))
    }
}

inventory::submit! {
    &ToiletFactory as &'static dyn DeviceFactory
}

// speaker.rs
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Device, DeviceFactory, DeviceStatus, DeviceVariant, Latency, actuator::Actuator};
use crate::{
    commands::{CommandKind, require_payload},
    error::AppError,
    events::EventSink,
    models::Outcome,
};

pub(super) const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

pub struct SpeakerDevice {
    power: RwLock<bool>,
    track: RwLock<Option<String>>,
    actuator: Actuator,
}

impl SpeakerDevice {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_latency(Latency::uniform(DEFAULT_LATENCY), sink)
    }

    pub fn with_latency(latency: Latency, sink: Arc<dyn EventSink>) -> Self {
        Self {
            power: RwLock::new(false),
            track: RwLock::new(None),
            actuator: Actuator::new(DeviceVariant::Speaker, latency, sink),
        }
    }
}

#[async_trait]
impl Device for SpeakerDevice {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Speaker
    }

    async fn handle(&self, kind: CommandKind, payload: Option<&str>) -> Result<Outcome, AppError> {
        match kind {
            CommandKind::SwitchOn => {
                let outcome = self
                    .actuator
                    .perform(kind, "Switching speaker on", "Speaker is on".into())
                    .await;
                *self.power.write().await = true;
                Ok(outcome)
            }
            CommandKind::SwitchOff => {
                let outcome = self
                    .actuator
                    .perform(kind, "Switching speaker off", "Speaker is off".into())
                    .await;
                *self.power.write().await = false;
                *self.track.write().await = None;
                Ok(outcome)
            }
            CommandKind::PlaySong => {
                let track = require_payload(kind, payload)?;
                let outcome = self
                    .actuator
                    .perform(kind, "Queueing track", format!("Playing {track}"))
                    .await;
                *self.track.write().await = Some(track.to_string());
                Ok(outcome)
            }
            _ => Err(super::unsupported(DeviceVariant::Speaker, kind)),
        }
    }

    async fn status(&self) -> DeviceStatus {
        DeviceStatus::Speaker {
            power: *self.power.read().await,
            track: self.track.read().await.clone(),
        }
    }
}

struct SpeakerFactory;

impl DeviceFactory for SpeakerFactory {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Speaker
    }

    fn create(&self, latency: Latency, sink: Arc<dyn EventSink>) -> Box<dyn Device> {
        Box::new(SpeakerDevice::with_latency(latency, sink))
    }
}

inventory::submit! {
    &SpeakerFactory as &'static dyn DeviceFactory
}

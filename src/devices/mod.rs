// devices/mod.rs
mod actuator;
mod light;
mod speaker;
mod toilet;

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    commands::{CommandKind, require_payload},
    error::AppError,
    events::EventSink,
    models::Outcome,
};

pub use actuator::Latency;
pub use light::LightDevice;
pub use speaker::SpeakerDevice;
pub use toilet::ToiletDevice;

/// Closed set of device kinds the hub knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceVariant {
    Light,
    Speaker,
    Toilet,
}

impl DeviceVariant {
    pub fn supported_commands(self) -> &'static [CommandKind] {
        match self {
            DeviceVariant::Light => &[CommandKind::SwitchOn, CommandKind::SwitchOff],
            DeviceVariant::Speaker => &[
                CommandKind::SwitchOn,
                CommandKind::SwitchOff,
                CommandKind::PlaySong,
            ],
            DeviceVariant::Toilet => &[CommandKind::Flush, CommandKind::Clean],
        }
    }

    pub fn default_latency(self) -> Duration {
        match self {
            DeviceVariant::Light => light::DEFAULT_LATENCY,
            DeviceVariant::Speaker => speaker::DEFAULT_LATENCY,
            DeviceVariant::Toilet => toilet::DEFAULT_LATENCY,
        }
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceVariant::Light => "LightDevice",
            DeviceVariant::Speaker => "SpeakerDevice",
            DeviceVariant::Toilet => "ToiletDevice",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceStatus {
    Light { power: bool },
    Speaker { power: bool, track: Option<String> },
    Toilet { flushes: u32, cleanings: u32 },
}

#[async_trait::async_trait]
pub trait Device: Send + Sync {
    fn variant(&self) -> DeviceVariant;

    fn supports(&self, kind: CommandKind) -> bool {
        self.variant().supported_commands().contains(&kind)
    }

    /// Performs `kind`. Commands outside the variant's set fail with
    /// [`AppError::UnsupportedCommand`].
    async fn handle(&self, kind: CommandKind, payload: Option<&str>) -> Result<Outcome, AppError>;

    async fn status(&self) -> DeviceStatus;

    /// Entry point used by the dispatcher: rejects unsupported kinds, then
    /// kinds whose payload is missing, before handing over to [`Device::handle`].
    async fn execute(&self, kind: CommandKind, payload: Option<&str>) -> Result<Outcome, AppError> {
        if !self.supports(kind) {
            return Err(unsupported(self.variant(), kind));
        }
        if kind.requires_payload() {
            require_payload(kind, payload)?;
        }
        self.handle(kind, payload).await
    }
}

/// Builds a device of one variant. Each variant submits one through `inventory`.
pub trait DeviceFactory: Sync {
    fn variant(&self) -> DeviceVariant;
    fn create(&self, latency: Latency, sink: Arc<dyn EventSink>) -> Box<dyn Device>;
}

inventory::collect!(&'static dyn DeviceFactory);

pub fn build(
    variant: DeviceVariant,
    latency: Latency,
    sink: Arc<dyn EventSink>,
) -> Option<Box<dyn Device>> {
    inventory::iter::<&'static dyn DeviceFactory>
        .into_iter()
        .find(|factory| factory.variant() == variant)
        .map(|factory| factory.create(latency, sink))
}

pub(crate) fn unsupported(variant: DeviceVariant, kind: CommandKind) -> AppError {
    AppError::UnsupportedCommand { variant, kind }
}

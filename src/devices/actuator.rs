// actuator.rs
use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    commands::CommandKind,
    events::{DeviceEvent, EventSink, Phase},
    models::Outcome,
};

use super::DeviceVariant;

/// Simulated actuation time per command.
#[derive(Debug, Clone, Default)]
pub struct Latency {
    default: Duration,
    overrides: HashMap<CommandKind, Duration>,
}

impl Latency {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn uniform(default: Duration) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with(mut self, kind: CommandKind, latency: Duration) -> Self {
        self.overrides.insert(kind, latency);
        self
    }

    pub fn for_kind(&self, kind: CommandKind) -> Duration {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }
}

/// Shared plumbing for the concrete devices: announce, wait, announce.
pub(crate) struct Actuator {
    variant: DeviceVariant,
    latency: Latency,
    sink: Arc<dyn EventSink>,
}

impl Actuator {
    pub(crate) fn new(variant: DeviceVariant, latency: Latency, sink: Arc<dyn EventSink>) -> Self {
        Self {
            variant,
            latency,
            sink,
        }
    }

    pub(crate) async fn perform(&self, kind: CommandKind, action: &str, done: String) -> Outcome {
        self.sink
            .emit(&DeviceEvent::new(self.variant, kind, Phase::Started, action));

        let delay = self.latency.for_kind(kind);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.sink
            .emit(&DeviceEvent::new(self.variant, kind, Phase::Completed, done.clone()));

        Outcome {
            device: self.variant,
            kind,
            description: done,
        }
    }
}

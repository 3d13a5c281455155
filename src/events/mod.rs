// events/mod.rs
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;

use crate::{commands::CommandKind, devices::DeviceVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Started,
    Completed,
}

/// Observable side effect of a device acting on a command.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceEvent {
    pub variant: DeviceVariant,
    pub kind: CommandKind,
    pub phase: Phase,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl DeviceEvent {
    pub fn new(
        variant: DeviceVariant,
        kind: CommandKind,
        phase: Phase,
        description: impl Into<String>,
    ) -> Self {
        Self {
            variant,
            kind,
            phase,
            description: description.into(),
            at: Utc::now(),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DeviceEvent);
}

/// Writes every event to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &DeviceEvent) {
        match event.phase {
            Phase::Started => info!(
                variant = %event.variant,
                kind = %event.kind,
                "{}...",
                event.description
            ),
            Phase::Completed => info!(
                variant = %event.variant,
                kind = %event.kind,
                "{}",
                event.description
            ),
        }
    }
}

/// Keeps events in emission order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<DeviceEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<DeviceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Position of the first event matching `kind` and `phase`.
    pub fn position(&self, kind: CommandKind, phase: Phase) -> Option<usize> {
        self.snapshot()
            .iter()
            .position(|e| e.kind == kind && e.phase == phase)
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &DeviceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

type Callback = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Fans events out to callbacks registered per device variant or for all variants.
pub struct EventBus {
    subscribers: DashMap<DeviceVariant, Vec<Callback>>,
    wildcard: Mutex<Vec<Callback>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            wildcard: Mutex::new(Vec::new()),
        }
    }

    /// Callbacks run on a snapshot taken before the first one is called, so a
    /// callback may subscribe; the new subscriber sees the next event.
    pub fn publish(&self, event: &DeviceEvent) {
        let mut callbacks: Vec<Callback> = self
            .subscribers
            .get(&event.variant)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default();
        callbacks.extend(
            self.wildcard
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .iter()
                .cloned(),
        );
        for callback in &callbacks {
            callback(event);
        }
    }

    pub fn subscribe<F: Fn(&DeviceEvent) + Send + Sync + 'static>(
        &self,
        variant: DeviceVariant,
        callback: F,
    ) {
        self.subscribers
            .entry(variant)
            .or_default()
            .push(Arc::new(callback));
    }

    pub fn subscribe_all<F: Fn(&DeviceEvent) + Send + Sync + 'static>(&self, callback: F) {
        self.wildcard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(callback));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &DeviceEvent) {
        self.publish(event);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{commands::CommandKind, devices::DeviceVariant};

/// Identity handed out by the registry when a device is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(u64);

impl DeviceId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device-{}", self.0)
    }
}

/// A command addressed to a registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    target: DeviceId,
    kind: CommandKind,
    payload: Option<String>,
}

impl Message {
    pub fn new(target: DeviceId, kind: CommandKind) -> Self {
        Self {
            target,
            kind,
            payload: None,
        }
    }

    pub fn with_payload(target: DeviceId, kind: CommandKind, payload: impl Into<String>) -> Self {
        Self {
            target,
            kind,
            payload: Some(payload.into()),
        }
    }

    pub fn target(&self) -> DeviceId {
        self.target
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

/// What a device reports after performing a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub device: DeviceVariant,
    pub kind: CommandKind,
    pub description: String,
}

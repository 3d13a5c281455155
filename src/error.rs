// error.rs
use std::time::Duration;

use thiserror::Error;

use crate::{commands::CommandKind, devices::DeviceVariant, models::DeviceId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unknown device {id}")]
    UnknownDevice { id: DeviceId },
    #[error("{variant} does not support {kind}")]
    UnsupportedCommand {
        variant: DeviceVariant,
        kind: CommandKind,
    },
    #[error("{kind} requires a payload")]
    MissingPayload { kind: CommandKind },
    #[error("{kind} on {id} timed out after {after:?}")]
    Timeout {
        id: DeviceId,
        kind: CommandKind,
        after: Duration,
    },
    #[error("{} parallel step(s) failed", .0.len())]
    Parallel(Vec<AppError>),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl AppError {
    /// Short label used for metrics and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownDevice { .. } => "unknown_device",
            AppError::UnsupportedCommand { .. } => "unsupported_command",
            AppError::MissingPayload { .. } => "missing_payload",
            AppError::Timeout { .. } => "timeout",
            AppError::Parallel(_) => "parallel",
            AppError::InvalidCommand(_) => "invalid_command",
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
        }
    }
}

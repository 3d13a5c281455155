// commands/mod.rs
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Every command a device can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    SwitchOn,
    SwitchOff,
    PlaySong,
    Flush,
    Clean,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::SwitchOn,
        CommandKind::SwitchOff,
        CommandKind::PlaySong,
        CommandKind::Flush,
        CommandKind::Clean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::SwitchOn => "SWITCH_ON",
            CommandKind::SwitchOff => "SWITCH_OFF",
            CommandKind::PlaySong => "PLAY_SONG",
            CommandKind::Flush => "FLUSH",
            CommandKind::Clean => "CLEAN",
        }
    }

    pub fn requires_payload(self) -> bool {
        matches!(self, CommandKind::PlaySong)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidCommand(s.to_string()))
    }
}

/// Returns the payload of a command that needs one, untouched. Blank text counts as missing.
pub fn require_payload(kind: CommandKind, payload: Option<&str>) -> Result<&str, AppError> {
    payload
        .filter(|p| !p.trim().is_empty())
        .ok_or(AppError::MissingPayload { kind })
}

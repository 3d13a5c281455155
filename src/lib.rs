// lib.rs
pub mod commands;
pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod program;
pub mod service;
pub mod utils;

pub use commands::CommandKind;
pub use devices::{Device, DeviceStatus, DeviceVariant, Latency};
pub use error::AppError;
pub use models::{DeviceId, Message, Outcome};
pub use program::{FailurePolicy, Program, Report, Step};
pub use service::IotService;

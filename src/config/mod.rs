// config/mod.rs
use std::time::Duration;

use ::config::{
    Config,
    builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    devices::{DeviceVariant, Latency},
    error::AppError,
    program::FailurePolicy,
};

#[derive(Debug, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub logging: LoggingSettings,
    #[validate(nested)]
    pub metrics: MetricsSettings,
    #[validate(nested)]
    pub dispatch: DispatchSettings,
    #[validate(nested)]
    pub devices: DevicesSettings,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoggingSettings {
    #[validate(length(min = 1))]
    pub level: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MetricsSettings {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub port: u16,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DispatchSettings {
    #[validate(range(min = 1, max = 600_000))]
    pub command_timeout_ms: Option<u64>,
    pub parallel_failure: FailurePolicy,
}

impl DispatchSettings {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DevicesSettings {
    #[validate(nested)]
    pub light: DeviceSettings,
    #[validate(nested)]
    pub speaker: DeviceSettings,
    #[validate(nested)]
    pub toilet: DeviceSettings,
}

impl DevicesSettings {
    pub fn latency(&self, variant: DeviceVariant) -> Latency {
        let settings = match variant {
            DeviceVariant::Light => &self.light,
            DeviceVariant::Speaker => &self.speaker,
            DeviceVariant::Toilet => &self.toilet,
        };
        Latency::uniform(Duration::from_millis(settings.latency_ms))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeviceSettings {
    #[validate(range(max = 60_000))]
    pub latency_ms: u64,
}

impl Settings {
    /// Defaults, then `config/config.toml` if present, then `IOT__*` variables.
    pub fn new() -> Result<Self, AppError> {
        Self::from_builder(
            Self::defaults()?
                .add_source(::config::File::with_name("config/config").required(false))
                .add_source(::config::Environment::with_prefix("IOT").separator("__")),
        )
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, AppError> {
        let latency_ms = |variant: DeviceVariant| variant.default_latency().as_millis() as u64;
        Ok(Config::builder()
            .set_default("logging.level", "info")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9000)?
            .set_default("dispatch.parallel_failure", "wait_all")?
            .set_default("devices.light.latency_ms", latency_ms(DeviceVariant::Light))?
            .set_default("devices.speaker.latency_ms", latency_ms(DeviceVariant::Speaker))?
            .set_default("devices.toilet.latency_ms", latency_ms(DeviceVariant::Toilet))?)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

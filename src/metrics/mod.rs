// metrics/mod.rs
use std::{net::SocketAddr, time::Duration};

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::{commands::CommandKind, devices::DeviceVariant};

pub const COMMANDS_TOTAL: &str = "iot_commands_total";
pub const COMMAND_DURATION: &str = "iot_command_duration_seconds";
pub const DEVICES_REGISTERED: &str = "iot_devices_registered_total";

/// Serves a Prometheus scrape endpoint on `port`. Must run inside a tokio runtime.
pub fn setup_metrics(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()
}

pub fn record_registration(variant: DeviceVariant) {
    counter!(DEVICES_REGISTERED, "variant" => variant.to_string()).increment(1);
}

pub fn record_dispatch(kind: CommandKind, result: &'static str, elapsed: Duration) {
    counter!(COMMANDS_TOTAL, "kind" => kind.as_str(), "result" => result).increment(1);
    histogram!(COMMAND_DURATION, "kind" => kind.as_str()).record(elapsed.as_secs_f64());
}

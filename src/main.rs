// main.rs
use std::sync::Arc;

use anyhow::Context;
use iot_dispatch::{
    CommandKind, DeviceId, DeviceVariant, FailurePolicy, IotService, Message, Program, Step,
    config::Settings,
    devices,
    events::{EventBus, EventSink, TracingSink},
    metrics, utils,
};
use tokio::time::Instant;
use tracing::info;

const WAKE_UP_TRACK: &str = "Rick Astley - Never Gonna Give You Up";

fn register(
    service: &IotService,
    settings: &Settings,
    variant: DeviceVariant,
    sink: Arc<dyn EventSink>,
) -> anyhow::Result<DeviceId> {
    let device = devices::build(variant, settings.devices.latency(variant), sink)
        .with_context(|| format!("No factory registered for {variant}"))?;
    Ok(service.register_boxed(device))
}

fn wake_up(light: DeviceId, speaker: DeviceId) -> Program {
    Program::new(
        "wake_up",
        Step::sequence([
            Step::parallel([
                Step::send(Message::new(light, CommandKind::SwitchOn)),
                Step::send(Message::new(speaker, CommandKind::SwitchOn)),
            ]),
            Step::send(Message::with_payload(
                speaker,
                CommandKind::PlaySong,
                WAKE_UP_TRACK,
            )),
        ]),
    )
}

fn sleep(light: DeviceId, speaker: DeviceId, toilet: DeviceId) -> Program {
    Program::new(
        "sleep",
        Step::sequence([
            Step::parallel([
                Step::send(Message::new(light, CommandKind::SwitchOff)),
                Step::send(Message::new(speaker, CommandKind::SwitchOff)),
            ]),
            Step::sequence([
                Step::send(Message::new(toilet, CommandKind::Flush)),
                Step::send(Message::new(toilet, CommandKind::Clean)),
            ]),
        ]),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();
    let settings = Settings::new().context("Failed to load config")?;
    utils::init_tracing(&settings.logging.level);

    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port).context("Failed to setup metrics")?;
        info!(port = settings.metrics.port, "Metrics exporter listening");
    }

    let mut service = IotService::new();
    if let Some(timeout) = settings.dispatch.command_timeout() {
        service = service.with_command_timeout(timeout);
    }
    let policy: FailurePolicy = settings.dispatch.parallel_failure;

    let bus = EventBus::new();
    bus.subscribe_all(|event| TracingSink.emit(event));
    let sink: Arc<dyn EventSink> = Arc::new(bus);

    let service = Arc::new(service);
    let (light, speaker, toilet) = tokio::try_join!(
        async { register(&service, &settings, DeviceVariant::Light, sink.clone()) },
        async { register(&service, &settings, DeviceVariant::Speaker, sink.clone()) },
        async { register(&service, &settings, DeviceVariant::Toilet, sink.clone()) },
    )?;

    for program in [wake_up(light, speaker), sleep(light, speaker, toilet)] {
        let report = program.run(&service, policy).await?;
        info!(
            program = %report.program,
            commands = report.outcomes.len(),
            elapsed = ?report.elapsed,
            "Program completed"
        );
    }

    let mut statuses = serde_json::Map::new();
    for id in service.device_ids() {
        let status = service.status(id).await?;
        statuses.insert(id.to_string(), serde_json::to_value(status)?);
    }
    println!("{}", serde_json::to_string_pretty(&statuses)?);

    info!(elapsed = ?started.elapsed(), "Elapsed");
    Ok(())
}

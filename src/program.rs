// program.rs
//! Composable command programs: sequences run one step at a time, parallel
//! groups run their members concurrently on the calling task.

use std::time::Duration;

use futures_util::{
    FutureExt,
    future::{BoxFuture, join_all, try_join_all},
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::info;

use crate::{
    error::AppError,
    models::{Message, Outcome},
    service::IotService,
};

/// How a parallel group reacts when one of its members fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let every member finish, then report the failures.
    #[default]
    WaitAll,
    /// Return the first failure and drop the members still running.
    FailFast,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Send(Message),
    Sequence(Vec<Step>),
    Parallel(Vec<Step>),
}

impl Step {
    pub fn send(message: Message) -> Self {
        Step::Send(message)
    }

    pub fn sequence(steps: impl IntoIterator<Item = Step>) -> Self {
        Step::Sequence(steps.into_iter().collect())
    }

    pub fn parallel(steps: impl IntoIterator<Item = Step>) -> Self {
        Step::Parallel(steps.into_iter().collect())
    }

    /// Number of messages in this step and its children.
    pub fn message_count(&self) -> usize {
        match self {
            Step::Send(_) => 1,
            Step::Sequence(steps) | Step::Parallel(steps) => {
                steps.iter().map(Step::message_count).sum()
            }
        }
    }

    /// Runs the step. Outcomes follow the listed order of the steps, not completion time.
    pub fn run<'a>(
        &'a self,
        service: &'a IotService,
        policy: FailurePolicy,
    ) -> BoxFuture<'a, Result<Vec<Outcome>, AppError>> {
        self.execute(service, policy).boxed()
    }

    async fn execute(
        &self,
        service: &IotService,
        policy: FailurePolicy,
    ) -> Result<Vec<Outcome>, AppError> {
        match self {
            Step::Send(message) => Ok(vec![service.send(message).await?]),
            Step::Sequence(steps) => {
                let mut outcomes = Vec::new();
                for step in steps {
                    outcomes.extend(step.run(service, policy).await?);
                }
                Ok(outcomes)
            }
            Step::Parallel(steps) => {
                let runs = steps.iter().map(|step| step.run(service, policy));
                match policy {
                    FailurePolicy::WaitAll => collect_all(join_all(runs).await),
                    FailurePolicy::FailFast => {
                        Ok(try_join_all(runs).await?.into_iter().flatten().collect())
                    }
                }
            }
        }
    }
}

fn collect_all(results: Vec<Result<Vec<Outcome>, AppError>>) -> Result<Vec<Outcome>, AppError> {
    let mut outcomes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(batch) => outcomes.extend(batch),
            Err(e) => errors.push(e),
        }
    }
    match errors.len() {
        0 => Ok(outcomes),
        1 => Err(errors.remove(0)),
        _ => Err(AppError::Parallel(errors)),
    }
}

/// A named tree of steps.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub root: Step,
}

#[derive(Debug)]
pub struct Report {
    pub program: String,
    pub outcomes: Vec<Outcome>,
    pub elapsed: Duration,
}

impl Program {
    pub fn new(name: impl Into<String>, root: Step) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    #[tracing::instrument(skip_all, fields(program = %self.name))]
    pub async fn run(&self, service: &IotService, policy: FailurePolicy) -> Result<Report, AppError> {
        let started = Instant::now();
        let outcomes = self.root.run(service, policy).await?;
        let elapsed = started.elapsed();
        info!(commands = outcomes.len(), ?elapsed, "Program finished");
        Ok(Report {
            program: self.name.clone(),
            outcomes,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::CommandKind,
        devices::{Latency, LightDevice, SpeakerDevice, ToiletDevice},
        events::{EventLog, Phase},
        models::DeviceId,
    };
    use std::sync::Arc;

    const LATENCY: Duration = Duration::from_millis(400);

    struct Fixture {
        service: IotService,
        log: Arc<EventLog>,
        light: DeviceId,
        speaker: DeviceId,
        toilet: DeviceId,
    }

    fn fixture(toilet_latency: Latency) -> Fixture {
        let log = Arc::new(EventLog::new());
        let service = IotService::new();
        let light = service.register(LightDevice::with_latency(
            Latency::uniform(LATENCY),
            log.clone(),
        ));
        let speaker = service.register(SpeakerDevice::with_latency(
            Latency::uniform(LATENCY),
            log.clone(),
        ));
        let toilet = service.register(ToiletDevice::with_latency(toilet_latency, log.clone()));
        Fixture {
            service,
            log,
            light,
            speaker,
            toilet,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_overlap_parallel_members() {
        let fx = fixture(Latency::uniform(LATENCY));
        let step = Step::parallel([
            Step::send(Message::new(fx.light, CommandKind::SwitchOn)),
            Step::send(Message::new(fx.speaker, CommandKind::SwitchOn)),
        ]);

        let start = Instant::now();
        let outcomes = step.run(&fx.service, FailurePolicy::WaitAll).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcomes.len(), 2);
        assert!(elapsed >= LATENCY);
        assert!(elapsed < LATENCY * 2, "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_sequence_strictly_in_order() {
        let fx = fixture(
            Latency::uniform(Duration::from_millis(50))
                .with(CommandKind::Flush, Duration::from_millis(900)),
        );
        let step = Step::sequence([
            Step::send(Message::new(fx.toilet, CommandKind::Flush)),
            Step::send(Message::new(fx.toilet, CommandKind::Clean)),
        ]);

        let start = Instant::now();
        let outcomes = step.run(&fx.service, FailurePolicy::WaitAll).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(950));
        assert_eq!(outcomes[0].kind, CommandKind::Flush);
        assert_eq!(outcomes[1].kind, CommandKind::Clean);
        let flush_done = fx.log.position(CommandKind::Flush, Phase::Completed).unwrap();
        let clean_start = fx.log.position(CommandKind::Clean, Phase::Started).unwrap();
        assert!(flush_done < clean_start);
    }

    #[tokio::test]
    async fn should_stop_sequence_at_first_failure() {
        let fx = fixture(Latency::none());
        let step = Step::sequence([
            Step::send(Message::new(fx.light, CommandKind::Flush)),
            Step::send(Message::new(fx.toilet, CommandKind::Flush)),
        ]);

        let err = step
            .run(&fx.service, FailurePolicy::WaitAll)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedCommand { .. }));
        assert_eq!(fx.log.position(CommandKind::Flush, Phase::Started), None);
    }

    #[tokio::test(start_paused = true)]
    async fn should_let_siblings_finish_before_reporting_failure() {
        let fx = fixture(Latency::uniform(LATENCY));
        let step = Step::parallel([
            Step::send(Message::new(fx.speaker, CommandKind::PlaySong)),
            Step::send(Message::new(fx.toilet, CommandKind::Flush)),
        ]);

        let err = step
            .run(&fx.service, FailurePolicy::WaitAll)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MissingPayload { .. }));
        assert!(fx.log.position(CommandKind::Flush, Phase::Completed).is_some());
    }

    #[tokio::test]
    async fn should_aggregate_multiple_parallel_failures() {
        let fx = fixture(Latency::none());
        let step = Step::parallel([
            Step::send(Message::new(fx.light, CommandKind::Clean)),
            Step::send(Message::new(fx.speaker, CommandKind::PlaySong)),
            Step::send(Message::new(fx.toilet, CommandKind::Flush)),
        ]);

        let err = step
            .run(&fx.service, FailurePolicy::WaitAll)
            .await
            .unwrap_err();

        match err {
            AppError::Parallel(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], AppError::UnsupportedCommand { .. }));
                assert!(matches!(errors[1], AppError::MissingPayload { .. }));
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_nested_sequences_side_by_side() {
        let toilet_latency = Duration::from_millis(300);
        let fx = fixture(Latency::uniform(toilet_latency));
        let step = Step::parallel([
            Step::sequence([
                Step::send(Message::new(fx.light, CommandKind::SwitchOn)),
                Step::send(Message::new(fx.light, CommandKind::SwitchOff)),
            ]),
            Step::sequence([
                Step::send(Message::new(fx.toilet, CommandKind::Flush)),
                Step::send(Message::new(fx.toilet, CommandKind::Clean)),
            ]),
        ]);

        let start = Instant::now();
        let outcomes = step.run(&fx.service, FailurePolicy::WaitAll).await.unwrap();
        let elapsed = start.elapsed();

        let kinds: Vec<_> = outcomes.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::SwitchOn,
                CommandKind::SwitchOff,
                CommandKind::Flush,
                CommandKind::Clean
            ]
        );
        // Longest branch is the light's, not the sum of both branches.
        assert!(elapsed >= LATENCY * 2);
        assert!(elapsed < LATENCY * 2 + toilet_latency * 2, "took {elapsed:?}");

        let position = |kind, phase| fx.log.position(kind, phase).unwrap();
        assert!(
            position(CommandKind::SwitchOn, Phase::Completed)
                < position(CommandKind::SwitchOff, Phase::Started)
        );
        assert!(
            position(CommandKind::Flush, Phase::Completed)
                < position(CommandKind::Clean, Phase::Started)
        );
        assert!(
            position(CommandKind::Flush, Phase::Started)
                < position(CommandKind::SwitchOn, Phase::Completed)
        );
    }

    #[tokio::test]
    async fn should_aggregate_failures_from_nested_groups() {
        let fx = fixture(Latency::none());
        let step = Step::parallel([
            Step::sequence([
                Step::send(Message::new(fx.light, CommandKind::Flush)),
                Step::send(Message::new(fx.light, CommandKind::SwitchOn)),
            ]),
            Step::sequence([
                Step::send(Message::new(fx.toilet, CommandKind::Flush)),
                Step::send(Message::new(fx.toilet, CommandKind::Clean)),
            ]),
            Step::parallel([
                Step::send(Message::new(fx.speaker, CommandKind::PlaySong)),
                Step::send(Message::new(fx.light, CommandKind::Clean)),
            ]),
        ]);

        let err = step
            .run(&fx.service, FailurePolicy::WaitAll)
            .await
            .unwrap_err();

        match err {
            AppError::Parallel(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(
                    errors[0],
                    AppError::UnsupportedCommand {
                        kind: CommandKind::Flush,
                        ..
                    }
                ));
                match &errors[1] {
                    AppError::Parallel(inner) => {
                        assert_eq!(inner.len(), 2);
                        assert!(matches!(inner[0], AppError::MissingPayload { .. }));
                        assert!(matches!(
                            inner[1],
                            AppError::UnsupportedCommand {
                                kind: CommandKind::Clean,
                                ..
                            }
                        ));
                    }
                    other => panic!("expected nested aggregate, got {other:?}"),
                }
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
        assert!(fx.log.position(CommandKind::Clean, Phase::Completed).is_some());
        assert_eq!(fx.log.position(CommandKind::SwitchOn, Phase::Started), None);
    }

    #[tokio::test(start_paused = true)]
    async fn should_drop_siblings_when_failing_fast() {
        let fx = fixture(Latency::uniform(LATENCY));
        let step = Step::parallel([
            Step::send(Message::new(fx.toilet, CommandKind::Flush)),
            Step::send(Message::new(fx.light, CommandKind::Flush)),
        ]);

        let err = step
            .run(&fx.service, FailurePolicy::FailFast)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedCommand { .. }));
        assert!(fx.log.position(CommandKind::Flush, Phase::Started).is_some());
        assert_eq!(fx.log.position(CommandKind::Flush, Phase::Completed), None);
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_program_outcomes_and_elapsed() {
        let fx = fixture(Latency::uniform(LATENCY));
        let program = Program::new(
            "sleep",
            Step::sequence([
                Step::parallel([
                    Step::send(Message::new(fx.light, CommandKind::SwitchOff)),
                    Step::send(Message::new(fx.speaker, CommandKind::SwitchOff)),
                ]),
                Step::sequence([
                    Step::send(Message::new(fx.toilet, CommandKind::Flush)),
                    Step::send(Message::new(fx.toilet, CommandKind::Clean)),
                ]),
            ]),
        );
        assert_eq!(program.root.message_count(), 4);

        let report = program
            .run(&fx.service, FailurePolicy::WaitAll)
            .await
            .unwrap();

        assert_eq!(report.program, "sleep");
        assert_eq!(report.outcomes.len(), 4);
        assert!(report.elapsed >= LATENCY * 3);
        assert!(report.elapsed < LATENCY * 4);
    }
}

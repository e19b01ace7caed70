//! Drives a tutorial run against a telemetry source.
//!
//! The runner owns the tick loop: once per tick interval it polls the
//! [`TelemetrySource`], feeds any stimuli and the snapshot into the
//! [`TaskSequencer`], and forwards the resulting notifications to a
//! [`NotificationSink`]. All core calls happen on this one task, so events
//! never interleave with ticks.

use std::time::Duration;

use anyhow::{Result, bail};
use tokio::time::interval;

use crate::sequencer::{Notification, RunReport, TaskSequencer};
use crate::telemetry::TelemetrySource;

/// A discrete input that occurred between ticks: a raw key event or a
/// physical checkpoint trigger hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stimulus {
    /// Named signal event, e.g. the gimbal-mode key.
    Event(String),
    /// The drone flew through gate `node` of `course`.
    Arrival { course: String, node: usize },
}

/// Receiver for sequencer and course notifications, implemented by the host
/// UI.
pub trait NotificationSink {
    fn on_task_changed(&mut self, index: usize, label: &str);
    fn on_tutorial_completed(&mut self);
    fn on_checkpoint_visibility(&mut self, course: &str, node: usize, visible: bool);
    fn on_correct_arrival(&mut self, course: &str, next: usize);
    fn on_wrong_arrival(&mut self, course: &str, node: usize, expected: usize);
    fn on_lap_completed(&mut self, course: &str);
}

/// Forward a batch of notifications to a sink.
pub fn dispatch(sink: &mut dyn NotificationSink, notes: &[Notification]) {
    for note in notes {
        match note {
            Notification::TaskChanged { index, label } => sink.on_task_changed(*index, label),
            Notification::TutorialCompleted => sink.on_tutorial_completed(),
            Notification::CheckpointVisibility {
                course,
                node,
                visible,
            } => sink.on_checkpoint_visibility(course, *node, *visible),
            Notification::CorrectArrival { course, next } => {
                sink.on_correct_arrival(course, *next)
            }
            Notification::WrongArrival {
                course,
                node,
                expected,
            } => sink.on_wrong_arrival(course, *node, *expected),
            Notification::LapCompleted { course } => sink.on_lap_completed(course),
        }
    }
}

/// Owns a sequencer and runs it to completion against a telemetry source.
pub struct TutorialRunner {
    sequencer: TaskSequencer,
    tick: Duration,
}

impl TutorialRunner {
    pub fn new(sequencer: TaskSequencer, tick: Duration) -> Self {
        Self { sequencer, tick }
    }

    /// Run until the tutorial finishes, returning the run report.
    ///
    /// Fails if the telemetry source runs dry before the final task
    /// completes.
    pub async fn run(
        &mut self,
        source: &mut dyn TelemetrySource,
        sink: &mut dyn NotificationSink,
    ) -> Result<RunReport> {
        dispatch(sink, &self.sequencer.start());

        let mut ticker = interval(self.tick);
        while !self.sequencer.is_finished() {
            ticker.tick().await;
            let Some(frame) = source.poll() else {
                bail!(
                    "telemetry source ended before the tutorial finished (task {} of {})",
                    self.sequencer.current_index() + 1,
                    self.sequencer.task_count()
                );
            };
            for stimulus in &frame.stimuli {
                let notes = match stimulus {
                    Stimulus::Event(event) => self.sequencer.notify_event(event),
                    Stimulus::Arrival { course, node } => self.sequencer.arrive(course, *node),
                };
                dispatch(sink, &notes);
            }
            let notes = self
                .sequencer
                .tick(&frame.snapshot, &frame.signals, self.tick);
            dispatch(sink, &notes);
        }

        Ok(self.sequencer.report())
    }
}

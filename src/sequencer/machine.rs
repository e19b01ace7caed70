use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::task::{ConditionKind, Phase, TaskDefinition};
use crate::conditions::{ConditionLibrary, Predicate};
use crate::course::{CheckpointCourse, CourseEvent};
use crate::error::SkystepError;
use crate::telemetry::{Signals, TelemetrySnapshot};

/// Notifications published to the host UI as tasks and courses progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A new task became active.
    TaskChanged { index: usize, label: String },
    /// Every task has been completed.
    TutorialCompleted,
    /// A checkpoint gate was shown or hidden.
    CheckpointVisibility {
        course: String,
        node: usize,
        visible: bool,
    },
    /// The pilot passed the expected gate; `next` is now the one to fly.
    CorrectArrival { course: String, next: usize },
    /// The pilot passed the wrong gate.
    WrongArrival {
        course: String,
        node: usize,
        expected: usize,
    },
    /// A full lap of the course was flown in order.
    LapCompleted { course: String },
}

// Condition resolved against the library at construction time, so an unknown
// name fails the whole run before it starts.
enum Binding {
    Predicate(Predicate),
    Event(String),
}

/// The tutorial task sequencing state machine.
///
/// Walks an ordered list of [`TaskDefinition`]s, evaluating the active task's
/// predicate on every tick (or waiting on an external event), and advances
/// after a fixed settle delay once the condition holds. Checkpoint courses are
/// owned by the sequencer so that gate visibility follows task activation and
/// lap completions feed straight back into the machine.
///
/// All entry points are synchronous; the settle delay is explicit countdown
/// state rather than a suspended routine, so at most one pending transition
/// can exist at any time.
pub struct TaskSequencer {
    tasks: Vec<TaskDefinition>,
    bindings: Vec<Binding>,
    courses: BTreeMap<String, CheckpointCourse>,
    index: usize,
    phase: Phase,
    settle: Duration,
    settle_remaining: Duration,
    run_id: String,
    completed: u32,
    wrong_arrivals: u32,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskSequencer {
    /// Build a sequencer over `tasks`, resolving every condition up front.
    ///
    /// `courses` maps course names to their validators; an `Event` condition
    /// must name either a course or one of `signal_events`.
    pub fn new(
        tasks: Vec<TaskDefinition>,
        library: &ConditionLibrary,
        courses: BTreeMap<String, CheckpointCourse>,
        signal_events: &[String],
        settle: Duration,
    ) -> Result<Self, SkystepError> {
        if tasks.is_empty() {
            return Err(SkystepError::EmptyTaskList);
        }

        let mut bindings = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            match &task.condition {
                ConditionKind::Polled(name) => {
                    let predicate = library.get(name).ok_or_else(|| {
                        SkystepError::UnknownPredicate {
                            index,
                            name: name.clone(),
                        }
                    })?;
                    bindings.push(Binding::Predicate(predicate));
                }
                ConditionKind::Event(name) => {
                    if !courses.contains_key(name) && !signal_events.contains(name) {
                        return Err(SkystepError::UnknownEvent {
                            index,
                            name: name.clone(),
                        });
                    }
                    bindings.push(Binding::Event(name.clone()));
                }
            }
        }

        Ok(Self {
            tasks,
            bindings,
            courses,
            index: 0,
            phase: Phase::Idle,
            settle,
            settle_remaining: Duration::ZERO,
            run_id: Uuid::new_v4().to_string(),
            completed: 0,
            wrong_arrivals: 0,
            started_at: None,
            finished_at: None,
        })
    }

    /// Begin the run: task 0 becomes active and its condition is evaluated
    /// from the next tick on. Calling on an already-started sequencer does
    /// nothing.
    pub fn start(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        if self.phase != Phase::Idle {
            debug!(phase = %self.phase, "start ignored, run already underway");
            return out;
        }
        self.phase = Phase::Waiting;
        self.index = 0;
        self.started_at = Some(Utc::now());
        out.push(Notification::TaskChanged {
            index: 0,
            label: self.tasks[0].label.clone(),
        });
        self.activate_current(&mut out);
        out
    }

    /// Advance the machine by one simulation tick of duration `dt`.
    ///
    /// In `Waiting` on a polled task this evaluates the bound predicate; in
    /// `Settling` it counts the settle delay down. Idle and finished
    /// sequencers ignore ticks.
    pub fn tick(
        &mut self,
        snapshot: &TelemetrySnapshot,
        signals: &Signals,
        dt: Duration,
    ) -> Vec<Notification> {
        let mut out = Vec::new();
        match self.phase {
            Phase::Settling => {
                self.settle_remaining = self.settle_remaining.saturating_sub(dt);
                if self.settle_remaining.is_zero() {
                    self.advance(&mut out);
                }
            }
            Phase::Waiting => {
                let satisfied = match &self.bindings[self.index] {
                    Binding::Predicate(predicate) => predicate(snapshot, signals),
                    Binding::Event(_) => false,
                };
                if satisfied {
                    self.begin_settling();
                }
            }
            Phase::Idle | Phase::Finished => {}
        }
        out
    }

    /// Report an external event (a course lap or a signal such as entering
    /// gimbal mode). Events that do not match the active task — wrong task,
    /// late delivery, duplicates — are silently ignored.
    pub fn notify_event(&mut self, event: &str) -> Vec<Notification> {
        if self.phase != Phase::Waiting {
            debug!(event, phase = %self.phase, "event ignored");
            return Vec::new();
        }
        let matches = matches!(
            &self.bindings[self.index],
            Binding::Event(name) if name.as_str() == event
        );
        if matches {
            self.begin_settling();
        } else {
            debug!(event, task = self.index, "event does not match active task");
        }
        Vec::new()
    }

    /// Route a physical checkpoint arrival to the named course. A resulting
    /// lap completion satisfies the active task if it is waiting on that
    /// course; stale arrivals outside `Waiting` are ignored.
    pub fn arrive(&mut self, course: &str, node: usize) -> Vec<Notification> {
        let mut out = Vec::new();
        if self.phase != Phase::Waiting {
            debug!(course, node, phase = %self.phase, "arrival ignored");
            return out;
        }
        let Some(validator) = self.courses.get_mut(course) else {
            debug!(course, node, "arrival for unknown course");
            return out;
        };

        let events = validator.arrive(node);
        let mut lap = false;
        for event in &events {
            match event {
                CourseEvent::LapCompleted => lap = true,
                CourseEvent::WrongArrival { .. } => self.wrong_arrivals += 1,
                _ => {}
            }
        }
        wrap_course_events(course, events, &mut out);
        if lap {
            out.extend(self.notify_event(course));
        }
        out
    }

    /// Snapshot of the run for reporting.
    pub fn report(&self) -> RunReport {
        RunReport::from_sequencer(self)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the active task; equals the task count once finished.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The active task, or `None` once the run has finished.
    pub fn current_task(&self) -> Option<&TaskDefinition> {
        self.tasks.get(self.index)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    // Arm the settle countdown. Overwrites any previous countdown, so at most
    // one pending transition exists.
    fn begin_settling(&mut self) {
        debug!(task = self.index, "task satisfied, settling");
        self.phase = Phase::Settling;
        self.settle_remaining = self.settle;
    }

    // The settle delay elapsed: leave the completed task and either activate
    // the next one or finish the run.
    fn advance(&mut self, out: &mut Vec<Notification>) {
        self.deactivate_current(out);
        self.completed += 1;

        if self.index + 1 < self.tasks.len() {
            self.index += 1;
            self.phase = Phase::Waiting;
            out.push(Notification::TaskChanged {
                index: self.index,
                label: self.tasks[self.index].label.clone(),
            });
            self.activate_current(out);
        } else {
            self.index = self.tasks.len();
            self.phase = Phase::Finished;
            self.finished_at = Some(Utc::now());
            out.push(Notification::TutorialCompleted);
        }
    }

    // Reveal the current gate when the active task is a course task.
    fn activate_current(&mut self, out: &mut Vec<Notification>) {
        if let ConditionKind::Event(name) = &self.tasks[self.index].condition
            && let Some(course) = self.courses.get_mut(name)
        {
            wrap_course_events(name, course.show_current(), out);
        }
    }

    // Hide the active course's gates when its task is left behind.
    fn deactivate_current(&mut self, out: &mut Vec<Notification>) {
        if let ConditionKind::Event(name) = &self.tasks[self.index].condition
            && let Some(course) = self.courses.get_mut(name)
        {
            wrap_course_events(name, course.hide_all(), out);
        }
    }
}

fn wrap_course_events(course: &str, events: Vec<CourseEvent>, out: &mut Vec<Notification>) {
    for event in events {
        out.push(match event {
            CourseEvent::Visibility { node, visible } => Notification::CheckpointVisibility {
                course: course.to_string(),
                node,
                visible,
            },
            CourseEvent::CorrectArrival { next } => Notification::CorrectArrival {
                course: course.to_string(),
                next,
            },
            CourseEvent::WrongArrival { node, expected } => Notification::WrongArrival {
                course: course.to_string(),
                node,
                expected,
            },
            CourseEvent::LapCompleted => Notification::LapCompleted {
                course: course.to_string(),
            },
        });
    }
}

/// Structured summary of a tutorial run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub phase: Phase,
    pub tasks_completed: u32,
    pub total_tasks: usize,
    pub wrong_arrivals: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl RunReport {
    fn from_sequencer(seq: &TaskSequencer) -> Self {
        let duration_ms = match (seq.started_at, seq.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            (Some(start), None) => Some((Utc::now() - start).num_milliseconds()),
            _ => None,
        };
        Self {
            run_id: seq.run_id.clone(),
            phase: seq.phase,
            tasks_completed: seq.completed,
            total_tasks: seq.tasks.len(),
            wrong_arrivals: seq.wrong_arrivals,
            started_at: seq.started_at,
            finished_at: seq.finished_at,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(100);
    const TICK: Duration = Duration::from_millis(25);

    fn seq(tasks: Vec<TaskDefinition>) -> TaskSequencer {
        seq_with_courses(tasks, BTreeMap::new())
    }

    fn seq_with_courses(
        tasks: Vec<TaskDefinition>,
        courses: BTreeMap<String, CheckpointCourse>,
    ) -> TaskSequencer {
        let library = ConditionLibrary::default();
        TaskSequencer::new(
            tasks,
            &library,
            courses,
            &["gimbal_mode".to_string()],
            SETTLE,
        )
        .unwrap()
    }

    fn armed() -> (TelemetrySnapshot, Signals) {
        let snap = TelemetrySnapshot {
            powered_on: true,
            ..Default::default()
        };
        (snap, Signals::default())
    }

    fn idle() -> (TelemetrySnapshot, Signals) {
        (TelemetrySnapshot::default(), Signals::default())
    }

    // Ticks until the settle delay has fully elapsed.
    fn settle_ticks() -> u32 {
        (SETTLE.as_millis() / TICK.as_millis()) as u32
    }

    fn count_task_changed(notes: &[Notification]) -> usize {
        notes
            .iter()
            .filter(|n| matches!(n, Notification::TaskChanged { .. }))
            .count()
    }

    #[test]
    fn empty_task_list_is_rejected() {
        let library = ConditionLibrary::default();
        let err = TaskSequencer::new(vec![], &library, BTreeMap::new(), &[], SETTLE);
        assert!(matches!(err, Err(SkystepError::EmptyTaskList)));
    }

    #[test]
    fn unknown_predicate_is_rejected() {
        let library = ConditionLibrary::default();
        let err = TaskSequencer::new(
            vec![TaskDefinition::polled("Warp", "warp_drive")],
            &library,
            BTreeMap::new(),
            &[],
            SETTLE,
        );
        assert!(matches!(
            err,
            Err(SkystepError::UnknownPredicate { index: 0, .. })
        ));
    }

    #[test]
    fn unknown_event_is_rejected() {
        let library = ConditionLibrary::default();
        let err = TaskSequencer::new(
            vec![TaskDefinition::event("Fly the loop", "loop")],
            &library,
            BTreeMap::new(),
            &[],
            SETTLE,
        );
        assert!(matches!(
            err,
            Err(SkystepError::UnknownEvent { index: 0, .. })
        ));
    }

    #[test]
    fn start_activates_first_task() {
        let mut seq = seq(vec![
            TaskDefinition::polled("Arm the drone", "armed"),
            TaskDefinition::polled("Disarm the drone", "disarmed"),
        ]);
        assert_eq!(seq.phase(), Phase::Idle);

        let notes = seq.start();
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.phase(), Phase::Waiting);
        assert_eq!(
            notes,
            vec![Notification::TaskChanged {
                index: 0,
                label: "Arm the drone".into()
            }]
        );

        // A second start is ignored.
        assert!(seq.start().is_empty());
        assert_eq!(seq.current_index(), 0);
    }

    #[test]
    fn satisfied_predicate_settles_exactly_once() {
        let mut seq = seq(vec![
            TaskDefinition::polled("Arm the drone", "armed"),
            TaskDefinition::polled("Disarm the drone", "disarmed"),
        ]);
        seq.start();

        let (snap, sig) = armed();
        // Condition stays true across many ticks; the settle countdown must
        // fire exactly once.
        let mut notes = Vec::new();
        for _ in 0..settle_ticks() * 3 {
            notes.extend(seq.tick(&snap, &sig, TICK));
        }
        assert_eq!(count_task_changed(&notes), 1);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.phase(), Phase::Waiting);
    }

    #[test]
    fn unsatisfied_predicate_never_advances() {
        let mut seq = seq(vec![TaskDefinition::polled("Arm the drone", "armed")]);
        seq.start();

        let (snap, sig) = idle();
        for _ in 0..200 {
            assert!(seq.tick(&snap, &sig, TICK).is_empty());
        }
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.phase(), Phase::Waiting);
    }

    #[test]
    fn advance_waits_for_the_settle_delay() {
        let mut seq = seq(vec![
            TaskDefinition::polled("Arm the drone", "armed"),
            TaskDefinition::polled("Disarm the drone", "disarmed"),
        ]);
        seq.start();

        let (snap, sig) = armed();
        assert!(seq.tick(&snap, &sig, TICK).is_empty());
        assert_eq!(seq.phase(), Phase::Settling);

        // One tick short of the settle delay: still settling.
        for _ in 0..settle_ticks() - 1 {
            assert!(seq.tick(&snap, &sig, TICK).is_empty());
        }
        assert_eq!(seq.phase(), Phase::Settling);

        let notes = seq.tick(&snap, &sig, TICK);
        assert_eq!(
            notes,
            vec![Notification::TaskChanged {
                index: 1,
                label: "Disarm the drone".into()
            }]
        );
    }

    #[test]
    fn mismatched_events_are_ignored() {
        let mut seq = seq(vec![
            TaskDefinition::polled("Arm the drone", "armed"),
            TaskDefinition::event("Enter gimbal mode", "gimbal_mode"),
        ]);
        seq.start();

        // Event for task 1 while task 0 is active.
        assert!(seq.notify_event("gimbal_mode").is_empty());
        assert_eq!(seq.current_index(), 0);

        // Unknown event name.
        assert!(seq.notify_event("nonsense").is_empty());
        assert_eq!(seq.current_index(), 0);
    }

    #[test]
    fn event_task_completes_on_matching_event() {
        let mut seq = seq(vec![TaskDefinition::event(
            "Enter gimbal mode",
            "gimbal_mode",
        )]);
        seq.start();

        assert!(seq.notify_event("gimbal_mode").is_empty());
        assert_eq!(seq.phase(), Phase::Settling);

        // Duplicate event while settling must not re-arm the countdown.
        let (snap, sig) = idle();
        for _ in 0..settle_ticks() / 2 {
            seq.tick(&snap, &sig, TICK);
        }
        assert!(seq.notify_event("gimbal_mode").is_empty());
        let mut notes = Vec::new();
        for _ in 0..settle_ticks() {
            notes.extend(seq.tick(&snap, &sig, TICK));
        }
        assert_eq!(notes, vec![Notification::TutorialCompleted]);
        assert!(seq.is_finished());
    }

    #[test]
    fn finished_sequencer_ignores_everything() {
        let mut seq = seq(vec![TaskDefinition::polled("Arm the drone", "armed")]);
        seq.start();

        let (snap, sig) = armed();
        let mut notes = Vec::new();
        for _ in 0..settle_ticks() + 1 {
            notes.extend(seq.tick(&snap, &sig, TICK));
        }
        assert_eq!(notes, vec![Notification::TutorialCompleted]);
        assert_eq!(seq.current_index(), 1);
        assert!(seq.current_task().is_none());

        for _ in 0..50 {
            assert!(seq.tick(&snap, &sig, TICK).is_empty());
        }
        assert!(seq.notify_event("gimbal_mode").is_empty());
        assert!(seq.arrive("track", 0).is_empty());
    }

    #[test]
    fn powered_toggle_scenario() {
        // Two polled tasks: powered on, then powered off. Feeding off/on/off
        // produces exactly two transitions, each after the settle delay.
        let mut seq = seq(vec![
            TaskDefinition::polled("Arm the drone", "armed"),
            TaskDefinition::polled("Disarm the drone", "disarmed"),
        ]);
        seq.start();

        let (off_snap, sig) = idle();
        let (on_snap, _) = armed();

        let mut notes = Vec::new();
        // Powered off: task 0 not satisfied.
        for _ in 0..10 {
            notes.extend(seq.tick(&off_snap, &sig, TICK));
        }
        assert!(notes.is_empty());

        // Powered on: task 0 satisfied, settles, task 1 activates.
        for _ in 0..settle_ticks() + 5 {
            notes.extend(seq.tick(&on_snap, &sig, TICK));
        }
        assert_eq!(count_task_changed(&notes), 1);
        assert_eq!(seq.current_index(), 1);

        // Powered off again: task 1 satisfied, run finishes.
        for _ in 0..settle_ticks() + 5 {
            notes.extend(seq.tick(&off_snap, &sig, TICK));
        }
        assert_eq!(count_task_changed(&notes), 1);
        assert_eq!(
            notes
                .iter()
                .filter(|n| matches!(n, Notification::TutorialCompleted))
                .count(),
            1
        );
        assert!(seq.is_finished());
    }

    #[test]
    fn course_task_drives_gate_visibility() {
        let mut courses = BTreeMap::new();
        courses.insert("track".to_string(), CheckpointCourse::new(3).unwrap());
        let mut seq = seq_with_courses(
            vec![
                TaskDefinition::event("Fly the track course", "track"),
                TaskDefinition::polled("Disarm the drone", "disarmed"),
            ],
            courses,
        );

        let notes = seq.start();
        assert!(notes.contains(&Notification::CheckpointVisibility {
            course: "track".into(),
            node: 0,
            visible: true
        }));

        let notes = seq.arrive("track", 0);
        assert!(notes.contains(&Notification::CorrectArrival {
            course: "track".into(),
            next: 1
        }));

        let notes = seq.arrive("track", 1);
        assert!(notes.contains(&Notification::CorrectArrival {
            course: "track".into(),
            next: 2
        }));

        // Final gate: lap completes and the task satisfies.
        let notes = seq.arrive("track", 2);
        assert!(notes.contains(&Notification::LapCompleted {
            course: "track".into()
        }));
        assert_eq!(seq.phase(), Phase::Settling);

        // After the settle delay the course goes dark and the next task
        // becomes active.
        let (snap, sig) = idle();
        let mut notes = Vec::new();
        for _ in 0..settle_ticks() {
            notes.extend(seq.tick(&snap, &sig, TICK));
        }
        assert!(notes.contains(&Notification::TaskChanged {
            index: 1,
            label: "Disarm the drone".into()
        }));
        assert_eq!(seq.current_index(), 1);
    }

    #[test]
    fn wrong_gate_is_reported_but_harmless() {
        let mut courses = BTreeMap::new();
        courses.insert("track".to_string(), CheckpointCourse::new(3).unwrap());
        let mut seq = seq_with_courses(
            vec![TaskDefinition::event("Fly the track course", "track")],
            courses,
        );
        seq.start();

        let notes = seq.arrive("track", 2);
        assert_eq!(
            notes,
            vec![Notification::WrongArrival {
                course: "track".into(),
                node: 2,
                expected: 0
            }]
        );
        assert_eq!(seq.phase(), Phase::Waiting);
        assert_eq!(seq.report().wrong_arrivals, 1);
    }

    #[test]
    fn lap_on_inactive_course_does_not_advance() {
        let mut courses = BTreeMap::new();
        courses.insert("track".to_string(), CheckpointCourse::new(2).unwrap());
        let mut seq = seq_with_courses(
            vec![
                TaskDefinition::polled("Arm the drone", "armed"),
                TaskDefinition::event("Fly the track course", "track"),
            ],
            courses,
        );
        seq.start();

        // Full lap while the arm task is still active: the validator keeps
        // its own books, but the sequencer must not move.
        seq.arrive("track", 0);
        let notes = seq.arrive("track", 1);
        assert!(notes.contains(&Notification::LapCompleted {
            course: "track".into()
        }));
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.phase(), Phase::Waiting);
    }

    #[test]
    fn arrival_for_unknown_course_is_ignored() {
        let mut seq = seq(vec![TaskDefinition::polled("Arm the drone", "armed")]);
        seq.start();
        assert!(seq.arrive("square", 0).is_empty());
    }

    #[test]
    fn report_reflects_progress() {
        let mut seq = seq(vec![
            TaskDefinition::polled("Arm the drone", "armed"),
            TaskDefinition::polled("Disarm the drone", "disarmed"),
        ]);

        let report = seq.report();
        assert_eq!(report.phase, Phase::Idle);
        assert_eq!(report.tasks_completed, 0);
        assert_eq!(report.total_tasks, 2);
        assert!(report.started_at.is_none());

        seq.start();
        let (snap, sig) = armed();
        for _ in 0..settle_ticks() + 1 {
            seq.tick(&snap, &sig, TICK);
        }
        let report = seq.report();
        assert_eq!(report.tasks_completed, 1);
        assert_eq!(report.phase, Phase::Waiting);
        assert!(report.started_at.is_some());
        assert!(report.finished_at.is_none());

        let (off_snap, _) = idle();
        for _ in 0..settle_ticks() + 1 {
            seq.tick(&off_snap, &sig, TICK);
        }
        let report = seq.report();
        assert_eq!(report.tasks_completed, 2);
        assert_eq!(report.phase, Phase::Finished);
        assert!(report.finished_at.is_some());
        assert!(report.duration_ms.is_some());
    }

    #[test]
    fn report_serializes_to_json() {
        let seq = seq(vec![TaskDefinition::polled("Arm the drone", "armed")]);
        let json = serde_json::to_string(&seq.report()).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_tasks, 1);
        assert_eq!(parsed.phase, Phase::Idle);
    }
}

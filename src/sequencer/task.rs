use std::fmt;

use serde::{Deserialize, Serialize};

/// How a task is marked complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Completion is detected by polling a named predicate every tick.
    Polled(String),
    /// Completion is signalled by an external event: a checkpoint course lap
    /// (the event name is the course name) or a declared signal event.
    Event(String),
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKind::Polled(name) => write!(f, "polled:{name}"),
            ConditionKind::Event(name) => write!(f, "event:{name}"),
        }
    }
}

/// One skill-check step in the tutorial sequence.
///
/// The ordered list of tasks is fixed for the lifetime of a run and owned by
/// the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Instruction text shown to the pilot.
    pub label: String,
    /// Completion condition.
    pub condition: ConditionKind,
}

impl TaskDefinition {
    pub fn polled(label: &str, predicate: &str) -> Self {
        Self {
            label: label.to_string(),
            condition: ConditionKind::Polled(predicate.to_string()),
        }
    }

    pub fn event(label: &str, event: &str) -> Self {
        Self {
            label: label.to_string(),
            condition: ConditionKind::Event(event.to_string()),
        }
    }
}

/// The phases of a tutorial run.
///
/// A run flows through: IDLE → WAITING → SETTLING → WAITING (next task) →
/// … → FINISHED. `Idle` exists only before `start`; `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Waiting,
    Settling,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Waiting => write!(f, "WAITING"),
            Phase::Settling => write!(f, "SETTLING"),
            Phase::Finished => write!(f, "FINISHED"),
        }
    }
}

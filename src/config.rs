//! Tutorial configuration loaded from `skystep.toml`.
//!
//! The [`TutorialConfig`] struct holds every configurable parameter; fields
//! missing from the file fall back to the stock drone tutorial. The
//! `SKYSTEP_SETTLE_MS` environment variable takes precedence over the file
//! for the settle delay.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::conditions::ConditionLibrary;
use crate::course::CheckpointCourse;
use crate::error::SkystepError;
use crate::sequencer::{TaskDefinition, TaskSequencer};

/// Top-level configuration for a tutorial run.
#[derive(Debug, Clone, Deserialize)]
pub struct TutorialConfig {
    /// Settle delay after a task's condition is satisfied, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Simulation tick interval in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Ordered task sequence.
    #[serde(default = "default_tasks")]
    pub tasks: Vec<TaskDefinition>,

    /// Checkpoint courses by name: number of gates in each.
    #[serde(default = "default_courses")]
    pub courses: BTreeMap<String, usize>,

    /// Event names that complete tasks but are not course laps.
    #[serde(default = "default_signal_events")]
    pub signal_events: Vec<String>,
}

// User-feedback pause between task completion and the next instruction: 2s.
fn default_settle_ms() -> u64 {
    2000
}

fn default_tick_ms() -> u64 {
    50
}

// The stock 11-task drone tutorial.
fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::polled("Arm the drone", "armed"),
        TaskDefinition::polled("Push the throttle up to ascend", "ascending"),
        TaskDefinition::polled("Ease the throttle down to descend", "descending"),
        TaskDefinition::polled("Pitch forward or back with the right stick", "pitching"),
        TaskDefinition::polled("Roll left or right with the right stick", "rolling"),
        TaskDefinition::polled("Rotate the drone with the yaw stick", "yawing"),
        TaskDefinition::event("Press 7 to enter gimbal mode", "gimbal_mode"),
        TaskDefinition::event("Fly through the track course gates in order", "track"),
        TaskDefinition::event("Fly the square course", "square"),
        TaskDefinition::polled("Land on the landing pad", "landed"),
        TaskDefinition::polled("Disarm the drone", "disarmed"),
    ]
}

fn default_courses() -> BTreeMap<String, usize> {
    BTreeMap::from([("track".to_string(), 6), ("square".to_string(), 4)])
}

fn default_signal_events() -> Vec<String> {
    vec!["gimbal_mode".to_string()]
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            tick_ms: default_tick_ms(),
            tasks: default_tasks(),
            courses: default_courses(),
            signal_events: default_signal_events(),
        }
    }
}

impl TutorialConfig {
    /// Load the configuration from `skystep.toml` in the current directory,
    /// falling back to defaults when the file does not exist.
    pub fn load() -> Result<Self, SkystepError> {
        let path = Path::new("skystep.toml");
        let mut config = if path.exists() {
            Self::from_path(path)?
        } else {
            Self::default()
        };

        // Environment variable takes precedence over the file.
        if let Ok(value) = std::env::var("SKYSTEP_SETTLE_MS")
            && let Ok(ms) = value.parse::<u64>()
        {
            config.settle_ms = ms;
        }

        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, SkystepError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Build the sequencer this configuration describes, validating the task
    /// list against `library` and constructing the checkpoint courses.
    pub fn build_sequencer(
        &self,
        library: &ConditionLibrary,
    ) -> Result<TaskSequencer, SkystepError> {
        if self.tick_ms == 0 {
            return Err(SkystepError::Config("tick_ms must be positive".into()));
        }
        let mut courses = BTreeMap::new();
        for (name, gates) in &self.courses {
            let course = CheckpointCourse::new(*gates).map_err(|e| {
                SkystepError::Config(format!("course `{name}`: {e}"))
            })?;
            courses.insert(name.clone(), course);
        }
        TaskSequencer::new(
            self.tasks.clone(),
            library,
            courses,
            &self.signal_events,
            self.settle(),
        )
    }
}

//! skystep — guided tutorial sequencer for drone flight training.
//!
//! The core is a task sequencing state machine ([`sequencer::TaskSequencer`])
//! that walks a learner through an ordered list of skill checks, advancing only
//! once each task's completion condition holds, plus a cyclic checkpoint
//! traversal validator ([`course::CheckpointCourse`]) backing the course-flying
//! tasks. Completion conditions are named predicates over a per-tick telemetry
//! snapshot ([`conditions::ConditionLibrary`]).
//!
//! The host simulation feeds ticks and events in; the sequencer publishes
//! [`sequencer::Notification`]s out. Everything else in the crate (config,
//! terminal UI, scripted demo flight) is wiring around that core.

pub mod cli;
pub mod conditions;
pub mod config;
pub mod course;
pub mod error;
pub mod runner;
pub mod script;
pub mod sequencer;
pub mod telemetry;
pub mod ui;

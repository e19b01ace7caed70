//! Telemetry snapshot and auxiliary signal inputs sampled by the sequencer.

use serde::{Deserialize, Serialize};

use crate::runner::Stimulus;

/// Read-only snapshot of the drone control state, sampled once per tick.
///
/// Axis values are normalized stick deflections in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Whether the motors are armed and startup has completed.
    pub powered_on: bool,
    /// Throttle axis, positive is up.
    pub vertical: f32,
    /// Pitch axis, positive is forward.
    pub pitch: f32,
    /// Roll axis, positive is right.
    pub roll: f32,
    /// Yaw axis, positive is clockwise.
    pub yaw: f32,
    /// Ground contact flag.
    pub grounded: bool,
}

/// Auxiliary signals that are not part of the control snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    /// Set once the pilot has switched into gimbal mode.
    pub gimbal_mode: bool,
    /// True while the drone sits inside the landing pad trigger.
    pub landing_pad_occupied: bool,
}

/// One tick of input from the host simulation: the control snapshot, the
/// auxiliary signals, and any discrete stimuli that occurred since the last
/// tick (key presses, checkpoint trigger hits).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightFrame {
    pub snapshot: TelemetrySnapshot,
    pub signals: Signals,
    pub stimuli: Vec<Stimulus>,
}

/// Per-tick input source, implemented by the host simulation.
///
/// Returning `None` means the source has no more frames; live sources never
/// run dry, scripted ones do.
pub trait TelemetrySource {
    fn poll(&mut self) -> Option<FlightFrame>;
}

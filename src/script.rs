//! Scripted flight used by the `demo` subcommand.
//!
//! [`ScriptedFlight`] synthesizes the frame sequence a real pilot would
//! produce for a given tutorial configuration: a neutral lead-in before each
//! task, the maneuver that satisfies it held long enough for the settle delay
//! to elapse, checkpoint arrivals in gate order (plus one deliberate wrong
//! gate on the first course), and duplicate event emissions that exercise the
//! sequencer's ignore policy. Persistent state (armed, grounded, gimbal mode)
//! carries across tasks; stick deflections are reset between them.

use std::collections::VecDeque;

use crate::config::TutorialConfig;
use crate::error::SkystepError;
use crate::runner::Stimulus;
use crate::sequencer::ConditionKind;
use crate::telemetry::{FlightFrame, TelemetrySource};

/// Frames of neutral input before each maneuver begins.
const LEAD_IN: u32 = 5;
/// Frames between consecutive checkpoint arrivals.
const GATE_SPACING: u32 = 2;
/// Extra frames held beyond the settle delay, as timing margin.
const SLACK: u32 = 10;

/// A pre-computed frame sequence implementing [`TelemetrySource`].
pub struct ScriptedFlight {
    frames: VecDeque<FlightFrame>,
}

impl TelemetrySource for ScriptedFlight {
    fn poll(&mut self) -> Option<FlightFrame> {
        self.frames.pop_front()
    }
}

impl ScriptedFlight {
    /// Build a script that flies every task of `config` in order.
    ///
    /// Fails with [`SkystepError::Unscriptable`] for polled predicates the
    /// script has no maneuver for.
    pub fn for_config(config: &TutorialConfig) -> Result<Self, SkystepError> {
        let settle_ticks = config.settle_ms.div_ceil(config.tick_ms.max(1)) as u32;
        let hold = settle_ticks + SLACK;

        let mut script = Builder::default();
        let mut wrong_gate_flown = false;

        for task in &config.tasks {
            script.neutral_sticks();
            script.hold(LEAD_IN);

            match &task.condition {
                ConditionKind::Polled(predicate) => {
                    script.maneuver(predicate)?;
                    script.hold(hold);
                }
                ConditionKind::Event(name) => match config.courses.get(name) {
                    Some(&gates) => {
                        for gate in 0..gates {
                            // One deliberate wrong pass, on the first course
                            // only, to show the validator shrugging it off.
                            if !wrong_gate_flown && gate == 1 && gates >= 3 {
                                script.stimulus(Stimulus::Arrival {
                                    course: name.clone(),
                                    node: gate + 1,
                                });
                                script.hold(GATE_SPACING);
                                wrong_gate_flown = true;
                            }
                            script.stimulus(Stimulus::Arrival {
                                course: name.clone(),
                                node: gate,
                            });
                            script.hold(GATE_SPACING);
                        }
                        script.hold(hold);
                    }
                    None => {
                        // Emit the event twice; the duplicate lands during
                        // the settle delay and must be ignored.
                        script.stimulus(Stimulus::Event(name.clone()));
                        script.stimulus(Stimulus::Event(name.clone()));
                        script.hold(hold);
                    }
                },
            }
        }

        script.hold(SLACK);
        Ok(Self {
            frames: script.frames,
        })
    }

    /// Number of frames remaining.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Default)]
struct Builder {
    base: FlightFrame,
    frames: VecDeque<FlightFrame>,
}

impl Builder {
    fn hold(&mut self, n: u32) {
        for _ in 0..n {
            self.frames.push_back(self.base.clone());
        }
    }

    fn stimulus(&mut self, stimulus: Stimulus) {
        let mut frame = self.base.clone();
        frame.stimuli.push(stimulus);
        self.frames.push_back(frame);
    }

    fn neutral_sticks(&mut self) {
        self.base.snapshot.vertical = 0.0;
        self.base.snapshot.pitch = 0.0;
        self.base.snapshot.roll = 0.0;
        self.base.snapshot.yaw = 0.0;
    }

    // Mutate the base frame so the named predicate holds. Flags persist
    // across tasks; stick deflections are cleared by `neutral_sticks`.
    fn maneuver(&mut self, predicate: &str) -> Result<(), SkystepError> {
        let snap = &mut self.base.snapshot;
        match predicate {
            "armed" => snap.powered_on = true,
            "disarmed" => snap.powered_on = false,
            "ascending" => {
                snap.vertical = 0.6;
                snap.grounded = false;
            }
            "descending" => snap.vertical = -0.6,
            "pitching" => snap.pitch = 0.8,
            "rolling" => snap.roll = 0.8,
            "yawing" => snap.yaw = 0.7,
            "landed" => {
                snap.grounded = true;
                self.base.signals.landing_pad_occupied = true;
            }
            "gimbal_mode" => self.base.signals.gimbal_mode = true,
            other => return Err(SkystepError::Unscriptable(other.to_string())),
        }
        Ok(())
    }
}

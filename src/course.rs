//! Ordered checkpoint course validation.
//!
//! A course is a cyclic sequence of checkpoint gates that must be flown in
//! order. The validator keeps one piece of traversal state — the ordinal of
//! the next expected gate — advancing it `+1 mod M` on each correct pass.
//! Wrapping from the last gate back to zero *is* lap completion; no separate
//! flag is needed. Wrong-gate passes never advance, rewind, or change
//! visibility.

use tracing::debug;

use crate::error::SkystepError;

/// Events published by a [`CheckpointCourse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseEvent {
    /// A gate changed visibility.
    Visibility { node: usize, visible: bool },
    /// The pilot passed the expected gate; `next` is now the one to fly.
    CorrectArrival { next: usize },
    /// The pilot passed `node` while `expected` was the gate to fly.
    WrongArrival { node: usize, expected: usize },
    /// The traversal wrapped back to gate zero: the lap is complete.
    LapCompleted,
}

/// Validates that checkpoint gates are passed in cyclic order and owns the
/// visibility state of every gate.
pub struct CheckpointCourse {
    visible: Vec<bool>,
    expected: usize,
}

impl CheckpointCourse {
    /// A course of `len` gates, all hidden, with gate 0 expected first.
    pub fn new(len: usize) -> Result<Self, SkystepError> {
        Self::with_start(len, 0)
    }

    /// A course of `len` gates with `start` as the first expected gate.
    pub fn with_start(len: usize, start: usize) -> Result<Self, SkystepError> {
        if len == 0 {
            return Err(SkystepError::EmptyCourse);
        }
        if start >= len {
            return Err(SkystepError::Config(format!(
                "start gate {start} is outside a course of {len} gates"
            )));
        }
        Ok(Self {
            visible: vec![false; len],
            expected: start,
        })
    }

    /// Number of gates in the course.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Ordinal of the gate the pilot must fly next.
    pub fn expected_node(&self) -> usize {
        self.expected
    }

    pub fn is_visible(&self, node: usize) -> bool {
        self.visible.get(node).copied().unwrap_or(false)
    }

    /// Process a physical arrival at `node`, reported by the host's trigger
    /// collaborator.
    pub fn arrive(&mut self, node: usize) -> Vec<CourseEvent> {
        let mut events = Vec::new();
        if node >= self.visible.len() {
            debug!(node, gates = self.visible.len(), "arrival outside course");
            return events;
        }
        if node != self.expected {
            debug!(node, expected = self.expected, "wrong gate");
            events.push(CourseEvent::WrongArrival {
                node,
                expected: self.expected,
            });
            return events;
        }

        self.set_visible(node, false, &mut events);
        let next = (node + 1) % self.visible.len();
        if next == 0 {
            // Wrapped: lap complete, course goes dark, state ready for reuse.
            self.expected = 0;
            events.push(CourseEvent::LapCompleted);
        } else {
            self.expected = next;
            self.set_visible(next, true, &mut events);
            events.push(CourseEvent::CorrectArrival { next });
        }
        events
    }

    /// Reveal the currently expected gate. Used when a course task becomes
    /// active; does not touch the traversal state, so re-entering a course
    /// resumes where it left off.
    pub fn show_current(&mut self) -> Vec<CourseEvent> {
        let mut events = Vec::new();
        let node = self.expected;
        self.set_visible(node, true, &mut events);
        events
    }

    /// Reveal a specific gate without touching the traversal state.
    pub fn show_node(&mut self, node: usize) -> Vec<CourseEvent> {
        let mut events = Vec::new();
        if node < self.visible.len() {
            self.set_visible(node, true, &mut events);
        }
        events
    }

    /// Hide every gate. Used when a course task is left behind.
    pub fn hide_all(&mut self) -> Vec<CourseEvent> {
        let mut events = Vec::new();
        for node in 0..self.visible.len() {
            self.set_visible(node, false, &mut events);
        }
        events
    }

    // Emits a visibility event only on actual change.
    fn set_visible(&mut self, node: usize, visible: bool, events: &mut Vec<CourseEvent>) {
        if self.visible[node] != visible {
            self.visible[node] = visible;
            events.push(CourseEvent::Visibility { node, visible });
        }
    }
}

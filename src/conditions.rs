//! Registry of named completion predicates.
//!
//! A predicate is a pure function of the current telemetry and signals; the
//! sequencer may evaluate it on every tick without affecting the outcome.
//! The built-in set covers the stock drone tutorial; hosts can register their
//! own predicates for custom task lists.

use std::collections::BTreeMap;

use crate::telemetry::{Signals, TelemetrySnapshot};

/// Stick deflection below this magnitude counts as at-rest.
pub const STICK_THRESHOLD: f32 = 0.1;

/// A named completion check. Must be stateless and side-effect-free.
pub type Predicate = fn(&TelemetrySnapshot, &Signals) -> bool;

/// Maps condition names to predicates.
pub struct ConditionLibrary {
    predicates: BTreeMap<String, Predicate>,
}

impl Default for ConditionLibrary {
    /// Library pre-populated with the built-in drone tutorial predicates.
    fn default() -> Self {
        let mut lib = Self::empty();
        lib.register("armed", |snap, _| snap.powered_on);
        lib.register("disarmed", |snap, _| !snap.powered_on);
        lib.register("ascending", |snap, _| snap.vertical > STICK_THRESHOLD);
        lib.register("descending", |snap, _| snap.vertical < -STICK_THRESHOLD);
        lib.register("pitching", |snap, _| snap.pitch.abs() > STICK_THRESHOLD);
        lib.register("rolling", |snap, _| snap.roll.abs() > STICK_THRESHOLD);
        lib.register("yawing", |snap, _| snap.yaw.abs() > STICK_THRESHOLD);
        lib.register("landed", |snap, sig| {
            snap.grounded && sig.landing_pad_occupied
        });
        lib.register("gimbal_mode", |_, sig| sig.gimbal_mode);
        lib
    }
}

impl ConditionLibrary {
    /// Library with no predicates registered.
    pub fn empty() -> Self {
        Self {
            predicates: BTreeMap::new(),
        }
    }

    /// Register a predicate under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, predicate: Predicate) {
        self.predicates.insert(name.to_string(), predicate);
    }

    pub fn get(&self, name: &str) -> Option<Predicate> {
        self.predicates.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Registered predicate names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> TelemetrySnapshot {
        TelemetrySnapshot::default()
    }

    #[test]
    fn builtin_arming_predicates() {
        let lib = ConditionLibrary::default();
        let armed = lib.get("armed").unwrap();
        let disarmed = lib.get("disarmed").unwrap();

        let mut s = snap();
        assert!(!armed(&s, &Signals::default()));
        assert!(disarmed(&s, &Signals::default()));

        s.powered_on = true;
        assert!(armed(&s, &Signals::default()));
        assert!(!disarmed(&s, &Signals::default()));
    }

    #[test]
    fn stick_predicates_respect_threshold() {
        let lib = ConditionLibrary::default();
        let ascending = lib.get("ascending").unwrap();
        let descending = lib.get("descending").unwrap();
        let pitching = lib.get("pitching").unwrap();
        let rolling = lib.get("rolling").unwrap();
        let yawing = lib.get("yawing").unwrap();
        let sig = Signals::default();

        let mut s = snap();
        s.vertical = 0.05;
        assert!(!ascending(&s, &sig));
        s.vertical = 0.2;
        assert!(ascending(&s, &sig));
        s.vertical = -0.2;
        assert!(descending(&s, &sig));

        s.pitch = -0.5;
        assert!(pitching(&s, &sig));
        s.roll = 0.15;
        assert!(rolling(&s, &sig));
        s.yaw = -0.11;
        assert!(yawing(&s, &sig));
    }

    #[test]
    fn landed_requires_ground_and_pad() {
        let lib = ConditionLibrary::default();
        let landed = lib.get("landed").unwrap();

        let mut s = snap();
        let mut sig = Signals::default();
        assert!(!landed(&s, &sig));

        s.grounded = true;
        assert!(!landed(&s, &sig));

        sig.landing_pad_occupied = true;
        assert!(landed(&s, &sig));
    }

    #[test]
    fn predicates_are_idempotent() {
        let lib = ConditionLibrary::default();
        let armed = lib.get("armed").unwrap();
        let mut s = snap();
        s.powered_on = true;
        let sig = Signals::default();
        for _ in 0..100 {
            assert!(armed(&s, &sig));
        }
    }

    #[test]
    fn custom_predicate_registration() {
        let mut lib = ConditionLibrary::empty();
        assert!(!lib.contains("inverted"));
        lib.register("inverted", |snap, _| snap.roll.abs() > 0.9);
        assert!(lib.contains("inverted"));

        let mut s = snap();
        s.roll = -0.95;
        assert!(lib.get("inverted").unwrap()(&s, &Signals::default()));
    }

    #[test]
    fn names_are_sorted() {
        let lib = ConditionLibrary::default();
        let names: Vec<_> = lib.names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"gimbal_mode"));
    }
}

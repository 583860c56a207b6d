//! Invariant verification for the timeline store.
//!
//! Interactive operations keep the store consistent by construction. Bulk
//! import deliberately skips the duplicate guard, and a host may edit its
//! markers behind the store's back, so the invariants can still be broken
//! from outside. The audit walks every instance and reports:
//!
//! - duplicate `(template_name, frame)` placements,
//! - marker names that drifted from `"{template_name}_{frame}"`,
//! - instances whose marker is gone or sits on another frame.

use std::collections::BTreeSet;

use cuemark_types::EventInstance;

use crate::InvariantViolation;
use crate::marker::MarkerStore;

/// The result of auditing a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Every invariant holds.
    Consistent,
    /// One or more invariants are broken.
    Violations(Vec<InvariantViolation>),
}

impl AuditResult {
    /// Whether every invariant holds.
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }

    /// The violations found, empty when consistent.
    pub fn violations(&self) -> &[InvariantViolation] {
        match self {
            Self::Consistent => &[],
            Self::Violations(found) => found,
        }
    }
}

/// Audit `instances` against `markers`.
pub fn audit<M: MarkerStore>(instances: &[EventInstance], markers: &M) -> AuditResult {
    let mut found = Vec::new();
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();

    for instance in instances {
        let pair = (instance.template_name.as_str(), instance.frame);
        if !seen.insert(pair) && reported.insert(pair) {
            found.push(InvariantViolation::DuplicatePlacement {
                template_name: instance.template_name.clone(),
                frame: instance.frame,
            });
        }

        let expected = instance.expected_marker_name();
        if instance.marker_name != expected {
            found.push(InvariantViolation::MarkerNameDrift {
                instance: instance.id,
                expected,
                actual: instance.marker_name.clone(),
            });
        }

        let mirrored = markers
            .find_by_name(&instance.marker_name)
            .is_some_and(|m| m.frame == instance.frame);
        if !mirrored {
            found.push(InvariantViolation::MissingMarker {
                name: instance.marker_name.clone(),
                frame: instance.frame,
            });
        }
    }

    if found.is_empty() {
        AuditResult::Consistent
    } else {
        AuditResult::Violations(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerTrack;

    #[test]
    fn mirrored_instances_are_consistent() {
        let mut markers = MarkerTrack::new();
        markers.create("Hit_1", 1);
        markers.create("Step_1", 1);
        let instances = vec![
            EventInstance::new("Hit", 1, Vec::new()),
            EventInstance::new("Step", 1, Vec::new()),
        ];
        assert_eq!(audit(&instances, &markers), AuditResult::Consistent);
    }

    #[test]
    fn duplicate_placement_reported_once() {
        let mut markers = MarkerTrack::new();
        for _ in 0..3 {
            markers.create("Hit_1", 1);
        }
        let instances: Vec<_> = (0..3)
            .map(|_| EventInstance::new("Hit", 1, Vec::new()))
            .collect();

        let result = audit(&instances, &markers);
        assert_eq!(
            result.violations(),
            &[InvariantViolation::DuplicatePlacement {
                template_name: "Hit".to_owned(),
                frame: 1,
            }]
        );
    }

    #[test]
    fn drift_and_missing_marker_detected() {
        let markers = MarkerTrack::new();
        let mut instance = EventInstance::new("Hit", 4, Vec::new());
        instance.frame = 5;

        let result = audit(&[instance], &markers);
        assert_eq!(result.violations().len(), 2);
        assert!(matches!(
            result.violations().first(),
            Some(InvariantViolation::MarkerNameDrift { .. })
        ));
        assert!(matches!(
            result.violations().get(1),
            Some(InvariantViolation::MissingMarker { frame: 5, .. })
        ));
    }

    #[test]
    fn marker_on_wrong_frame_is_missing() {
        let mut markers = MarkerTrack::new();
        markers.create("Hit_4", 9);
        let instances = vec![EventInstance::new("Hit", 4, Vec::new())];
        assert!(!audit(&instances, &markers).is_consistent());
    }
}

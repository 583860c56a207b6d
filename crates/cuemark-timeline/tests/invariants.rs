//! Property tests for the timeline store.
//!
//! Random sequences of interactive operations must never break the
//! uniqueness or mirroring invariants, and refused operations must leave the
//! store untouched.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use cuemark_timeline::{MarkerStore, MarkerTrack, TimelineError, TimelineStore};
use cuemark_types::{Frame, TemplateId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add { template: usize, frame: Frame },
    Duplicate { instance: usize, frame: Frame },
    Remove { frame: Frame },
    SetFrame { instance: usize, frame: Frame },
    Retarget { instance: usize, template: usize },
    MoveToCurrent { instance: usize, cursor: Frame },
}

fn arb_frame() -> impl Strategy<Value = Frame> {
    0..12_i32
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3_usize, arb_frame()).prop_map(|(template, frame)| Op::Add { template, frame }),
        (0..8_usize, arb_frame()).prop_map(|(instance, frame)| Op::Duplicate { instance, frame }),
        arb_frame().prop_map(|frame| Op::Remove { frame }),
        (0..8_usize, arb_frame()).prop_map(|(instance, frame)| Op::SetFrame { instance, frame }),
        (0..8_usize, 0..4_usize)
            .prop_map(|(instance, template)| Op::Retarget { instance, template }),
        (0..8_usize, arb_frame())
            .prop_map(|(instance, cursor)| Op::MoveToCurrent { instance, cursor }),
    ]
}

fn seeded() -> (TimelineStore<MarkerTrack>, Vec<TemplateId>) {
    let mut store = TimelineStore::new(MarkerTrack::new());
    let ids = (0..3)
        .map(|_| store.add_template().map(|t| t.id).unwrap())
        .collect();
    (store, ids)
}

fn apply(store: &mut TimelineStore<MarkerTrack>, templates: &[TemplateId], op: &Op) {
    let instance_id = |store: &TimelineStore<MarkerTrack>, index: usize| {
        let all = store.instances();
        if all.is_empty() {
            None
        } else {
            Some(all[index % all.len()].id)
        }
    };

    match *op {
        Op::Add { template, frame } => {
            let _ = store.add_to_timeline(templates[template], frame);
        }
        Op::Duplicate { instance, frame } => {
            if let Some(id) = instance_id(store, instance) {
                let _ = store.duplicate_event(id, Some(frame));
            }
        }
        Op::Remove { frame } => {
            let _ = store.remove_from_timeline(frame);
        }
        Op::SetFrame { instance, frame } => {
            if let Some(id) = instance_id(store, instance) {
                let _ = store.set_frame(id, frame);
            }
        }
        Op::Retarget { instance, template } => {
            if let Some(id) = instance_id(store, instance) {
                // Index 3 names a template that does not exist.
                let name = store
                    .templates()
                    .get(template)
                    .map_or_else(|| "Missing".to_owned(), |t| t.name.clone());
                let _ = store.set_template_name(id, &name);
            }
        }
        Op::MoveToCurrent { instance, cursor } => {
            if let Some(id) = instance_id(store, instance) {
                store.set_current_frame(cursor);
                let _ = store.move_to_current(id);
            }
        }
    }
}

proptest! {
    #[test]
    fn interactive_operations_preserve_invariants(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (mut store, templates) = seeded();
        for op in &ops {
            apply(&mut store, &templates, op);
            let audit = store.audit();
            prop_assert!(audit.is_consistent(), "after {:?}: {:?}", op, audit.violations());
        }
        prop_assert_eq!(store.instances().len(), store.markers().len());
    }

    #[test]
    fn refused_placement_changes_nothing(frame in arb_frame()) {
        let (mut store, templates) = seeded();
        store.add_to_timeline(templates[0], frame).unwrap();
        let before_instances = store.instances().to_vec();
        let before_markers = store.markers().clone();

        let refused = store.add_to_timeline(templates[0], frame);
        let is_duplicate = matches!(refused, Err(TimelineError::DuplicateEvent { .. }));
        prop_assert!(is_duplicate);
        prop_assert_eq!(store.instances(), before_instances.as_slice());
        prop_assert_eq!(store.markers(), &before_markers);
    }

    #[test]
    fn clear_all_leaves_foreign_markers(frames in prop::collection::btree_set(arb_frame(), 0..8)) {
        let (mut store, templates) = seeded();
        for frame in &frames {
            store.add_to_timeline(templates[1], *frame).unwrap();
        }
        store.markers_mut().create("camera_cut", 100);

        prop_assert_eq!(store.clear_all(), frames.len());
        prop_assert_eq!(store.markers().len(), 1);
        prop_assert!(store.markers().find_by_name("camera_cut").is_some());
    }
}

//! Property Tests: Bell-LaPadula Invariants
//!
//! For every pair of labels the read rule must equal "subject dominates
//! object" and the write rule must equal "object dominates subject",
//! decomposed into the level and compartment conditions. Exercises the
//! full cross product of defined levels with small compartment sets.

use cordon_core::{dominates, subset_of, superset_of, ClassificationLevel, SecurityLabel};
use cordon_mac::MacEngine;
use proptest::prelude::*;

fn any_level() -> impl Strategy<Value = ClassificationLevel> {
    prop::sample::select(ClassificationLevel::ALL.to_vec())
}

fn any_label() -> impl Strategy<Value = SecurityLabel> {
    (
        any_level(),
        prop::collection::btree_set(
            prop::sample::select(vec!["alpha", "bravo", "crypto"]),
            0..3,
        ),
    )
        .prop_map(|(level, tags)| SecurityLabel::new(level, tags))
}

proptest! {
    #[test]
    fn read_rule_decomposes(subject in any_label(), object in any_label()) {
        let expected = dominates(subject.level, object.level)
            && superset_of(&subject.compartments, &object.compartments);
        prop_assert_eq!(MacEngine::can_read(&subject, &object), expected);
    }

    #[test]
    fn write_rule_decomposes(subject in any_label(), object in any_label()) {
        let expected = dominates(object.level, subject.level)
            && subset_of(&subject.compartments, &object.compartments);
        prop_assert_eq!(MacEngine::can_write(&subject, &object), expected);
    }

    #[test]
    fn read_and_write_both_hold_only_between_equal_labels(
        subject in any_label(),
        object in any_label(),
    ) {
        if MacEngine::can_read(&subject, &object) && MacEngine::can_write(&subject, &object) {
            prop_assert_eq!(subject, object);
        }
    }

    #[test]
    fn enforce_agrees_with_check(subject in any_label(), object in any_label()) {
        prop_assert_eq!(
            MacEngine::enforce_read(&subject, &object).is_ok(),
            MacEngine::can_read(&subject, &object)
        );
        prop_assert_eq!(
            MacEngine::enforce_write(&subject, &object).is_ok(),
            MacEngine::can_write(&subject, &object)
        );
    }
}

#[test]
fn exhaustive_level_cross_product_without_compartments() {
    for a in ClassificationLevel::ALL {
        for b in ClassificationLevel::ALL {
            let subject = SecurityLabel::uncompartmented(a);
            let object = SecurityLabel::uncompartmented(b);
            assert_eq!(MacEngine::can_read(&subject, &object), a.rank() >= b.rank());
            assert_eq!(MacEngine::can_write(&subject, &object), b.rank() >= a.rank());
        }
    }
}

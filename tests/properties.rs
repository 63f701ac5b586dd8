//! Algebraic invariants from spec §8 ("Invariants (for all)"), checked
//! against randomly generated patterns rather than a fixed table.

use proptest::prelude::*;

use jedi_core::{Attribute, Pattern, Slot};

fn slot_strategy() -> impl Strategy<Value = Slot> {
    prop_oneof![
        Just(None),
        prop::collection::vec(any::<u8>(), 0..6).prop_map(Some),
    ]
}

fn pattern_strategy(len: usize) -> impl Strategy<Value = Pattern> {
    prop::collection::vec(slot_strategy(), len).prop_map(Pattern::from_slots)
}

proptest! {
    #[test]
    fn equals_implies_matches_both_ways(
        p in pattern_strategy(4),
        q in pattern_strategy(4),
    ) {
        if p.equals(&q) {
            prop_assert!(p.matches(&q));
            prop_assert!(q.matches(&p));
        }
    }

    #[test]
    fn fully_bound_pattern_matches_itself(
        bytes in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..4), 4),
    ) {
        let slots: Vec<Slot> = bytes.into_iter().map(Some).collect();
        let p = Pattern::from_slots(slots);
        prop_assert!(p.matches(&p));
    }

    #[test]
    fn reference_reuse_never_changes_the_equal_verdict(
        p in pattern_strategy(4),
        q in pattern_strategy(4),
    ) {
        let q_attrs = q.to_attribute_list();
        let (attrs, equal) = p.to_attribute_list_with_reference(&q, &q_attrs);

        prop_assert_eq!(equal, p.equals(&q));
        if equal {
            let plain: Vec<Option<Attribute>> = p.to_attribute_list();
            prop_assert_eq!(attrs.len(), plain.len());
            for (a, b) in attrs.iter().zip(plain.iter()) {
                match (a, b) {
                    (None, None) => {}
                    (Some(a), Some(b)) => prop_assert_eq!(a.as_ref(), b.as_ref()),
                    _ => prop_assert!(false, "attribute presence mismatch"),
                }
            }
        }
    }
}

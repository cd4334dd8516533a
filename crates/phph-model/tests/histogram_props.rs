//! Property tests for the histogram's aggregation invariants: the total
//! count is conserved, and a state's stored outcome never changes.

use phph_model::{Histogram, Outcome};
use proptest::prelude::*;

/// Deterministic classification used by the generated observation streams;
/// any pure function of the state keeps outcomes consistent per state.
fn classify(values: &[i32]) -> Outcome {
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    Outcome::from_check(sum % 2 == 0)
}

proptest! {
    #[test]
    fn total_equals_sum_of_buckets(
        observations in prop::collection::vec(prop::collection::vec(0_i32..4, 3), 0..200)
    ) {
        let mut h = Histogram::new();
        for (i, values) in observations.iter().enumerate() {
            h.record(values, classify(values), i as u64).unwrap();
        }

        prop_assert_eq!(h.total(), observations.len() as u64);
        let bucket_sum: u64 = h.iter().map(|(_, info)| info.occurs).sum();
        prop_assert_eq!(bucket_sum, h.total());
    }

    #[test]
    fn stored_outcome_is_stable(
        observations in prop::collection::vec(prop::collection::vec(0_i32..3, 2), 1..100)
    ) {
        let mut h = Histogram::new();
        for (i, values) in observations.iter().enumerate() {
            let info = h.record(values, classify(values), i as u64).unwrap();
            prop_assert_eq!(info.outcome, classify(values));
        }

        for (state, info) in h.iter() {
            prop_assert_eq!(info.outcome, classify(state.values()));
        }
    }

    #[test]
    fn conflicting_outcome_is_fatal_and_side_effect_free(
        values in prop::collection::vec(0_i32..4, 1..4)
    ) {
        let mut h = Histogram::new();
        h.record(&values, Outcome::Accepted, 0).unwrap();
        let err = h.record(&values, Outcome::Rejected, 1).unwrap_err();
        prop_assert_eq!(err.stored, Outcome::Accepted);
        prop_assert_eq!(err.latest, Outcome::Rejected);
        prop_assert_eq!(h.total(), 1);

        // A consistent re-record still works after the rejected one.
        h.record(&values, Outcome::Accepted, 2).unwrap();
        prop_assert_eq!(h.total(), 2);
    }

    #[test]
    fn first_iteration_tracks_first_sight(
        gap in 1_u64..1000
    ) {
        let mut h = Histogram::new();
        h.record(&[7], Outcome::Accepted, 3).unwrap();
        let info = h.record(&[7], Outcome::Accepted, 3 + gap).unwrap();
        prop_assert_eq!(info.first_iteration, 3);
        prop_assert_eq!(info.occurs, 2);
    }
}

#[cfg(test)]
mod proptests {
    use crate::availability::has_conflict;
    use crate::slots::{format_hhmm, generate_slots, parse_hhmm};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn hhmm() -> impl Strategy<Value = u32> {
        0u32..(24 * 60)
    }

    proptest! {
        #[test]
        fn grid_is_sorted_unique_and_bounded(
            granularity in prop_oneof![Just(15u32), Just(30u32), Just(60u32)],
            start in hhmm(),
            span in 0u32..(12 * 60),
        ) {
            let end = (start + span).min(24 * 60 - 1);
            let slots = generate_slots(granularity, &format_hhmm(start), &format_hhmm(end));

            let mut seen = HashSet::new();
            let mut previous: Option<u32> = None;
            for slot in &slots {
                let minutes = parse_hhmm(slot).expect("grid emits valid HH:mm");
                prop_assert!(minutes >= start && minutes <= end);
                prop_assert_eq!((minutes - start) % granularity, 0);
                if let Some(prev) = previous {
                    prop_assert!(minutes > prev);
                }
                prop_assert!(seen.insert(minutes));
                previous = Some(minutes);
            }
            // Expected count: every aligned point in [start, end].
            let expected = (end.saturating_sub(start)) / granularity + 1;
            prop_assert_eq!(slots.len() as u32, expected);
        }

        #[test]
        fn conflict_detection_matches_interval_overlap_on_aligned_intervals(
            a_start in 0u32..40, a_len in 1u32..5,
            b_start in 0u32..40, b_len in 1u32..5,
        ) {
            // Work in 30-minute units on a single day.
            let step = 30;
            let (a0, a1) = (a_start * step, (a_start + a_len) * step);
            let (b0, b1) = (b_start * step, (b_start + b_len) * step);

            let mut occupied = HashSet::new();
            let mut m = a0;
            while m < a1 {
                occupied.insert(format_hhmm(m));
                m += step;
            }

            let detected = has_conflict(&format_hhmm(b0), &format_hhmm(b1), &occupied, step);
            let overlaps = b0 < a1 && b1 > a0;
            prop_assert_eq!(detected, overlaps);
        }
    }
}

use proptest::prelude::*;

use crate::evaluation::statistics::{erf, national_standing, percentile};
use crate::evaluation::IndicatorStatistics;

#[test]
fn erf_matches_reference_values() {
    assert!(erf(0.0).abs() < 1e-7);
    assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
    assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
    assert!((erf(2.0) - 0.995_322_27).abs() < 1e-6);
}

#[test]
fn percentile_one_deviation_above_mean() {
    assert_eq!(percentile(3.0, 2.5, 0.5), 84);
    assert_eq!(percentile(2.0, 2.5, 0.5), 16);
}

#[test]
fn degenerate_deviation_sits_at_median() {
    assert_eq!(percentile(4.0, 2.5, 0.0), 50);
    assert_eq!(percentile(1.0, 2.5, -1.0), 50);
    assert_eq!(percentile(1.0, 2.5, f64::NAN), 50);
}

#[test]
fn extreme_scores_stay_within_bounds() {
    assert_eq!(percentile(4.0, 1.0, 0.1), 100);
    assert_eq!(percentile(1.0, 4.0, 0.1), 0);
}

#[test]
fn standing_copies_reference_figures() {
    let statistics = IndicatorStatistics {
        indicator_id: "M1T1-I1".to_string(),
        mean: 2.6,
        standard_deviation: 0.7,
        evaluations: 1200,
    };
    let standing = national_standing(2.6, &statistics);
    assert_eq!(standing.national_mean, 2.6);
    assert_eq!(standing.standard_deviation, 0.7);
    assert_eq!(standing.percentile, 50);
}

proptest! {
    #[test]
    fn percentile_is_monotone_in_score(
        low in 1.0f64..4.0,
        delta in 0.0f64..3.0,
        mean in 1.0f64..4.0,
        deviation in 0.05f64..2.0,
    ) {
        let high = low + delta;
        prop_assert!(percentile(low, mean, deviation) <= percentile(high, mean, deviation));
    }

    #[test]
    fn mean_score_is_median(mean in 1.0f64..4.0, deviation in 0.05f64..2.0) {
        prop_assert_eq!(percentile(mean, mean, deviation), 50);
    }
}

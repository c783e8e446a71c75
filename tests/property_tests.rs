/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use credit_risk_api::borrowers::validate_page;
use credit_risk_api::models::{RegionRiskRow, RiskLevel};
use credit_risk_api::portfolio::rank_regions;
use credit_risk_api::scoring::{risk_level_for_score, score_from_probability};
use proptest::prelude::*;

// Property: the score formula and tier bands hold for every probability
proptest! {
    #[test]
    fn score_matches_truncation_formula(p in 0.0f64..=1.0) {
        let (score, _) = score_from_probability(p);
        prop_assert_eq!(score, (850.0 - 550.0 * p).trunc() as i32);
        prop_assert!((300..=850).contains(&score));
    }

    #[test]
    fn tier_is_pure_function_of_score(p in 0.0f64..=1.0) {
        let (score, tier) = score_from_probability(p);
        prop_assert_eq!(tier, risk_level_for_score(score));
        let expected = if score < 650 {
            RiskLevel::High
        } else if score < 750 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        prop_assert_eq!(tier, expected);
    }

    #[test]
    fn score_never_increases_with_probability(p1 in 0.0f64..=1.0, p2 in 0.0f64..=1.0) {
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        prop_assert!(score_from_probability(lo).0 >= score_from_probability(hi).0);
    }
}

fn region_rows() -> impl Strategy<Value = Vec<RegionRiskRow>> {
    prop::collection::vec((1i64..10_000, 1i64..100, 0.0f64..=1.0), 0..25).prop_map(|raw| {
        raw.into_iter()
            .map(|(region_id, total, frac)| {
                let high = ((total as f64) * frac).floor() as i64;
                RegionRiskRow {
                    region_id,
                    region_name: format!("region-{}", region_id),
                    total_borrowers: total,
                    high_risk_count: high.min(total),
                }
            })
            .collect()
    })
}

// Property: region ranking is a deterministic total order
proptest! {
    #[test]
    fn ranking_preserves_every_region(rows in region_rows()) {
        let expected = rows.len();
        let ranked = rank_regions(rows);
        prop_assert_eq!(ranked.len(), expected);
    }

    #[test]
    fn ranking_is_sorted_with_documented_tie_break(rows in region_rows()) {
        let ranked = rank_regions(rows);
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.high_risk_percentage > b.high_risk_percentage
                    || (a.high_risk_percentage == b.high_risk_percentage
                        && a.region_id <= b.region_id),
                "order violated: ({}, {}) before ({}, {})",
                a.region_id, a.high_risk_percentage, b.region_id, b.high_risk_percentage
            );
        }
    }

    #[test]
    fn percentages_are_bounded_and_two_decimal(rows in region_rows()) {
        for stat in rank_regions(rows) {
            prop_assert!((0.0..=100.0).contains(&stat.high_risk_percentage));
            let scaled = stat.high_risk_percentage * 100.0;
            prop_assert!((scaled - scaled.round()).abs() < 1e-6,
                "not rounded to 2 decimals: {}", stat.high_risk_percentage);
        }
    }
}

// Property: pagination bounds are enforced before any query
proptest! {
    #[test]
    fn valid_pages_accepted(skip in 0i64..100_000, limit in 1i64..=1000) {
        let (s, l) = validate_page(Some(skip), Some(limit)).unwrap();
        prop_assert_eq!(s, skip);
        prop_assert_eq!(l, limit);
    }

    #[test]
    fn negative_skip_rejected(skip in i64::MIN..0) {
        prop_assert!(validate_page(Some(skip), Some(10)).is_err());
    }

    #[test]
    fn out_of_range_limit_rejected(limit in prop_oneof![i64::MIN..=0, 1001i64..=i64::MAX]) {
        prop_assert!(validate_page(Some(0), Some(limit)).is_err());
    }
}

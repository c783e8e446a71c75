/// Unit tests for the scoring path
/// Tests the probability -> score -> tier transform, the model artifact,
/// and feature validation
use credit_risk_api::errors::AppError;
use credit_risk_api::models::{FeatureVector, RiskLevel, ScoreResponse};
use credit_risk_api::scoring::{
    risk_level_for_score, round2, score_from_probability, RiskScorer, ScoringModel,
};

fn sample_features() -> FeatureVector {
    FeatureVector {
        limit_bal: 120_000.0,
        age: 34.0,
        avg_pay_delay: 0.5,
        credit_utilization: 0.45,
        payment_ratio: 0.12,
    }
}

#[cfg(test)]
mod transform_tests {
    use super::*;

    #[test]
    fn test_golden_probability_table() {
        // Concrete values fixed by the transform contract
        assert_eq!(score_from_probability(0.02), (839, RiskLevel::Low));
        assert_eq!(score_from_probability(0.50), (575, RiskLevel::High));
        // 850 - 550 * 0.15 = 767.5 truncates to 767 (not rounded to 768)
        assert_eq!(score_from_probability(0.15), (767, RiskLevel::Low));
    }

    #[test]
    fn test_extreme_probabilities() {
        assert_eq!(score_from_probability(0.0), (850, RiskLevel::Low));
        assert_eq!(score_from_probability(1.0), (300, RiskLevel::High));
    }

    #[test]
    fn test_band_edges_exact() {
        // The tier is evaluated against the truncated score with half-open bands
        assert_eq!(risk_level_for_score(649), RiskLevel::High);
        assert_eq!(risk_level_for_score(650), RiskLevel::Medium);
        assert_eq!(risk_level_for_score(749), RiskLevel::Medium);
        assert_eq!(risk_level_for_score(750), RiskLevel::Low);
        assert_eq!(risk_level_for_score(850), RiskLevel::Low);
    }

    #[test]
    fn test_truncation_is_toward_zero_not_rounding() {
        // Scores just above a band edge must not be rounded across it
        // 850 - 550 * 0.3635 = 650.075 -> 650 -> Medium
        assert_eq!(score_from_probability(0.3635), (650, RiskLevel::Medium));
        // 850 - 550 * 0.36365 ~= 649.9925 -> 649 -> High
        assert_eq!(score_from_probability(0.36365), (649, RiskLevel::High));
    }

    #[test]
    fn test_probability_reported_at_two_decimals() {
        assert_eq!(round2(0.123), 0.12);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.9999), 1.0);
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_artifact_loads_and_predicts_in_range() {
        let model = ScoringModel::load("models/credit_model.json")
            .expect("bundled artifact should load");

        let p = model.predict(&sample_features());
        assert!(p > 0.0 && p < 1.0, "probability out of range: {}", p);
    }

    #[test]
    fn test_missing_artifact_is_model_unavailable() {
        let err = ScoringModel::load("models/does_not_exist.json").unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
    }

    #[test]
    fn test_scorer_outcome_is_internally_consistent() {
        let scorer = RiskScorer::load("models/credit_model.json").unwrap();
        let outcome = scorer.score(&sample_features()).unwrap();

        let (expected_score, expected_tier) = score_from_probability(outcome.probability);
        assert_eq!(outcome.credit_score, expected_score);
        assert_eq!(outcome.risk_level, expected_tier);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let scorer = RiskScorer::load("models/credit_model.json").unwrap();
        let features = sample_features();

        let first = scorer.score(&features).unwrap();
        let second = scorer.score(&features).unwrap();

        assert_eq!(first.probability, second.probability);
        assert_eq!(first.credit_score, second.credit_score);
        assert_eq!(first.risk_level, second.risk_level);
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let scorer = RiskScorer::load("models/credit_model.json").unwrap();

        let mut features = sample_features();
        features.payment_ratio = f64::NAN;
        assert!(matches!(
            scorer.score(&features),
            Err(AppError::BadRequest(_))
        ));

        features.payment_ratio = f64::NEG_INFINITY;
        assert!(matches!(
            scorer.score(&features),
            Err(AppError::BadRequest(_))
        ));
    }
}

#[cfg(test)]
mod response_shape_tests {
    use super::*;

    #[test]
    fn test_score_response_uses_client_contract_keys() {
        let response = ScoreResponse {
            pd: 0.15,
            credit_score: 767,
            risk_level: RiskLevel::Low,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["PD"], 0.15);
        assert_eq!(value["Credit_Score"], 767);
        assert_eq!(value["Risk_Level"], "Low");
    }
}

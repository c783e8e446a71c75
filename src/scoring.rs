use crate::errors::AppError;
use crate::models::{FeatureVector, RiskLevel};
use serde::Deserialize;
use std::path::Path;

/// Parameters of the pre-trained classifier.
///
/// The artifact is a standardized logistic regression exported to JSON:
/// probability = sigmoid(intercept + Σ w_i * (x_i - mean_i) / scale_i).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelParams {
    pub intercept: f64,
    pub coefficients: FeatureVector,
    pub feature_means: FeatureVector,
    pub feature_scales: FeatureVector,
}

/// Pre-trained feature → probability capability.
///
/// Opaque to the rest of the engine: callers see only `predict`.
#[derive(Debug, Clone)]
pub struct ScoringModel {
    params: ModelParams,
}

impl ScoringModel {
    /// Builds a model from already-parsed parameters.
    pub fn new(params: ModelParams) -> Result<Self, AppError> {
        let scales = &params.feature_scales;
        for (name, scale) in [
            ("limit_bal", scales.limit_bal),
            ("age", scales.age),
            ("avg_pay_delay", scales.avg_pay_delay),
            ("credit_utilization", scales.credit_utilization),
            ("payment_ratio", scales.payment_ratio),
        ] {
            if !scale.is_finite() || scale == 0.0 {
                return Err(AppError::ModelUnavailable(format!(
                    "model artifact has invalid scale for feature '{}'",
                    name
                )));
            }
        }
        Ok(Self { params })
    }

    /// Loads the model artifact from disk.
    ///
    /// A missing or corrupt artifact is a startup-time failure, not a
    /// per-request recoverable one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ModelUnavailable(format!(
                "model artifact not found at {}: {}",
                path.display(),
                e
            ))
        })?;
        let params: ModelParams = serde_json::from_str(&raw).map_err(|e| {
            AppError::ModelUnavailable(format!(
                "failed to parse model artifact {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(params)
    }

    /// Predicts the probability of default for a feature vector.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let p = &self.params;
        let z = p.intercept
            + p.coefficients.limit_bal
                * standardize(features.limit_bal, p.feature_means.limit_bal, p.feature_scales.limit_bal)
            + p.coefficients.age
                * standardize(features.age, p.feature_means.age, p.feature_scales.age)
            + p.coefficients.avg_pay_delay
                * standardize(
                    features.avg_pay_delay,
                    p.feature_means.avg_pay_delay,
                    p.feature_scales.avg_pay_delay,
                )
            + p.coefficients.credit_utilization
                * standardize(
                    features.credit_utilization,
                    p.feature_means.credit_utilization,
                    p.feature_scales.credit_utilization,
                )
            + p.coefficients.payment_ratio
                * standardize(
                    features.payment_ratio,
                    p.feature_means.payment_ratio,
                    p.feature_scales.payment_ratio,
                );
        sigmoid(z)
    }
}

fn standardize(value: f64, mean: f64, scale: f64) -> f64 {
    (value - mean) / scale
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// The full scoring outcome for one feature vector.
#[derive(Debug, Clone, Copy)]
pub struct ScoreOutcome {
    /// Probability of default, unrounded. Round only at the reporting edge.
    pub probability: f64,
    pub credit_score: i32,
    pub risk_level: RiskLevel,
}

/// Converts a probability into a credit score and risk tier.
///
/// `credit_score = trunc(850 - probability * 550)`, truncated toward zero
/// rather than rounded: probability 0.15 yields 767 (from 767.5), not 768.
/// The score is not clamped; for probabilities within the model contract
/// it already lands in [300, 850].
pub fn score_from_probability(probability: f64) -> (i32, RiskLevel) {
    let credit_score = (850.0 - probability * 550.0).trunc() as i32;
    (credit_score, risk_level_for_score(credit_score))
}

/// Assigns the risk tier for a truncated credit score.
///
/// Half-open bands: score < 650 is High, 650 ≤ score < 750 is Medium,
/// score ≥ 750 is Low.
pub fn risk_level_for_score(score: i32) -> RiskLevel {
    if score < 650 {
        RiskLevel::High
    } else if score < 750 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Rounds a probability for outward-facing reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Evaluates borrower credit risk: feature validation, model prediction,
/// and the deterministic probability → score → tier transform.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    model: ScoringModel,
}

impl RiskScorer {
    pub fn new(model: ScoringModel) -> Self {
        Self { model }
    }

    /// Loads the scorer from a model artifact path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        Ok(Self::new(ScoringModel::load(path)?))
    }

    /// Scores a feature vector.
    ///
    /// Pure with respect to its inputs: no side effects, identical inputs
    /// give identical outcomes.
    pub fn score(&self, features: &FeatureVector) -> Result<ScoreOutcome, AppError> {
        validate_features(features)?;
        let probability = self.model.predict(features);
        let (credit_score, risk_level) = score_from_probability(probability);
        Ok(ScoreOutcome {
            probability,
            credit_score,
            risk_level,
        })
    }
}

/// Rejects feature vectors carrying non-finite values.
///
/// Missing fields are already rejected at deserialization; NaN and
/// infinities can still arrive through upstream arithmetic.
pub fn validate_features(features: &FeatureVector) -> Result<(), AppError> {
    for (name, value) in [
        ("limit_bal", features.limit_bal),
        ("age", features.age),
        ("avg_pay_delay", features.avg_pay_delay),
        ("credit_utilization", features.credit_utilization),
        ("payment_ratio", features.payment_ratio),
    ] {
        if !value.is_finite() {
            return Err(AppError::BadRequest(format!(
                "feature '{}' must be a finite number",
                name
            )));
        }
    }
    Ok(())
}

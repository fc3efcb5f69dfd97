//! Rule-based stand-in used when no trained model is available.
//!
//! Not medically validated. It only guarantees the pipeline always answers
//! with a probability that grows with the classic risk factors.

use crate::models::classifier::Classifier;
use crate::types::Confidence;
use crate::vectorizer::FEATURE_COUNT;

const AGE: usize = 0;
const SEX: usize = 1;
const CP: usize = 2;
const TRESTBPS: usize = 3;
const CHOL: usize = 4;
const THALACH: usize = 7;

/// Additive risk rules over raw clinical values, capped at 0.9
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub const MAX_PROBABILITY: f64 = 0.9;

    pub fn new() -> Self {
        Self
    }

    fn risk_score(features: &[f64]) -> f64 {
        let rules: [(bool, f64); 6] = [
            (features[AGE] > 60.0, 0.2),
            (features[SEX] == 1.0, 0.1),
            (features[CP] > 1.0, 0.3),
            (features[TRESTBPS] > 140.0, 0.2),
            (features[CHOL] > 250.0, 0.2),
            (features[THALACH] < 120.0, 0.2),
        ];
        rules
            .iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, weight)| weight)
            .sum()
    }
}

impl Classifier for RuleBasedClassifier {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    fn positive_probability(&self, features: &[f64]) -> f64 {
        Self::risk_score(features).min(Self::MAX_PROBABILITY)
    }

    fn confidence(&self) -> Confidence {
        Confidence::Fallback
    }
}

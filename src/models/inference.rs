//! Inference engine: scale, classify, clamp, threshold

use crate::config::InferenceConfig;
use crate::error::PredictError;
use crate::models::loader::ModelContext;
use crate::types::Confidence;
use crate::vectorizer::FeatureVector;
use tracing::debug;

/// Outcome of running one feature vector through the model pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    /// Clamped positive-class probability
    pub probability: f64,
    pub label: u8,
    pub confidence: Confidence,
}

/// Runs the selected classifier and post-processes its output
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    floor: f64,
    ceiling: f64,
    threshold: f64,
}

impl InferenceEngine {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            floor: config.probability_floor,
            ceiling: config.probability_ceiling,
            threshold: config.decision_threshold,
        }
    }

    /// Clamp bounds applied to every probability
    pub fn bounds(&self) -> (f64, f64) {
        (self.floor, self.ceiling)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scale the vector, classify it and map the probability to a label.
    ///
    /// The label is 1 only when the clamped probability is strictly above the threshold.
    pub fn infer(
        &self,
        features: &FeatureVector,
        context: &ModelContext,
    ) -> Result<Inference, PredictError> {
        let scaled = context.scaler().transform(features.as_slice())?;

        let classifier = context.classifier();
        if scaled.len() != classifier.n_features() {
            return Err(PredictError::ScalingDimensionMismatch {
                expected: classifier.n_features(),
                actual: scaled.len(),
            });
        }

        let raw = classifier.positive_probability(&scaled);
        if !raw.is_finite() {
            return Err(PredictError::InvalidProbability(raw));
        }

        let probability = raw.clamp(self.floor, self.ceiling);
        let label = u8::from(probability > self.threshold);

        debug!(
            model = classifier.name(),
            scaler = context.scaler().name(),
            raw_probability = raw,
            probability = probability,
            label = label,
            "Inference complete"
        );

        Ok(Inference {
            probability,
            label,
            confidence: classifier.confidence(),
        })
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new(&InferenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::Classifier;
    use crate::models::loader::ModelSource;
    use crate::models::scaler::IdentityScaler;
    use crate::vectorizer::{FeatureVectorizer, FEATURE_COUNT};
    use crate::types::ClinicalRecord;

    /// Returns a fixed probability regardless of input
    struct ConstantClassifier {
        probability: f64,
        n_features: usize,
    }

    impl Classifier for ConstantClassifier {
        fn name(&self) -> &str {
            "constant"
        }

        fn n_features(&self) -> usize {
            self.n_features
        }

        fn positive_probability(&self, _features: &[f64]) -> f64 {
            self.probability
        }

        fn confidence(&self) -> Confidence {
            Confidence::Low
        }
    }

    fn context_returning(probability: f64) -> ModelContext {
        ModelContext::new(
            Box::new(ConstantClassifier {
                probability,
                n_features: FEATURE_COUNT,
            }),
            Box::new(IdentityScaler::new(FEATURE_COUNT)),
            ModelSource::Fallback,
        )
    }

    fn infer(probability: f64) -> Result<Inference, PredictError> {
        InferenceEngine::default().infer(&FeatureVector::defaults(), &context_returning(probability))
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(infer(0.5).unwrap().label, 0);
        assert_eq!(infer(0.5000001).unwrap().label, 1);
    }

    #[test]
    fn test_probability_clamped() {
        for raw in [0.0, 0.01, 0.05, 0.3, 0.7, 0.95, 0.99, 1.0] {
            let inference = infer(raw).unwrap();
            assert!(inference.probability >= 0.05 && inference.probability <= 0.95);
        }
        assert_eq!(infer(0.0).unwrap().probability, 0.05);
        assert_eq!(infer(1.0).unwrap().probability, 0.95);
        assert_eq!(infer(0.42).unwrap().probability, 0.42);
    }

    #[test]
    fn test_non_finite_probability_rejected() {
        assert!(matches!(infer(f64::NAN), Err(PredictError::InvalidProbability(_))));
        assert!(matches!(
            infer(f64::INFINITY),
            Err(PredictError::InvalidProbability(_))
        ));
    }

    #[test]
    fn test_classifier_width_mismatch() {
        let context = ModelContext::new(
            Box::new(ConstantClassifier {
                probability: 0.3,
                n_features: 5,
            }),
            Box::new(IdentityScaler::new(FEATURE_COUNT)),
            ModelSource::Fallback,
        );
        let result = InferenceEngine::default().infer(&FeatureVector::defaults(), &context);
        assert!(matches!(
            result,
            Err(PredictError::ScalingDimensionMismatch {
                expected: 5,
                actual: FEATURE_COUNT
            })
        ));
    }

    #[test]
    fn test_fallback_high_risk_patient() {
        let record = ClinicalRecord::new()
            .with_field("age", 70)
            .with_field("sex", 1)
            .with_field("cp", 3)
            .with_field("trestbps", 160)
            .with_field("chol", 300)
            .with_field("thalach", 100);
        let features = FeatureVectorizer::new().vectorize(&record).unwrap();

        let inference = InferenceEngine::default()
            .infer(&features, &ModelContext::fallback())
            .unwrap();

        assert!(inference.probability >= 0.5);
        assert_eq!(inference.probability, 0.9);
        assert_eq!(inference.label, 1);
        assert_eq!(inference.confidence, Confidence::Fallback);
    }

    #[test]
    fn test_fallback_defaults_are_low_risk() {
        let inference = InferenceEngine::default()
            .infer(&FeatureVector::defaults(), &ModelContext::fallback())
            .unwrap();
        assert_eq!(inference.probability, 0.05);
        assert_eq!(inference.label, 0);
    }
}

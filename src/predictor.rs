//! End-to-end prediction: record -> features -> inference -> result

use crate::config::{AppConfig, InferenceConfig};
use crate::error::PredictError;
use crate::models::inference::InferenceEngine;
use crate::models::loader::{ModelContext, ModelLoader};
use crate::types::{ClinicalRecord, PredictionResult};
use crate::vectorizer::FeatureVectorizer;
use tracing::{info, warn};

/// Owns the model context for the lifetime of the process
pub struct Predictor {
    vectorizer: FeatureVectorizer,
    engine: InferenceEngine,
    context: ModelContext,
    fallback_probability: f64,
}

impl Predictor {
    /// Invalid inference settings are replaced by the defaults
    pub fn new(context: ModelContext, config: &AppConfig) -> Self {
        let inference = match config.inference.validate() {
            Ok(()) => config.inference.clone(),
            Err(e) => {
                warn!(error = %e, "Invalid inference settings, using defaults");
                InferenceConfig::default()
            }
        };
        Self {
            vectorizer: FeatureVectorizer::new(),
            engine: InferenceEngine::new(&inference),
            context,
            fallback_probability: inference.fallback_probability,
        }
    }

    /// Locate or build the model pair, then wrap it
    pub fn from_config(config: &AppConfig) -> Self {
        let context = ModelLoader::from_config(config).load();
        let predictor = Self::new(context, config);
        let (floor, ceiling) = predictor.engine.bounds();
        info!(
            source = %predictor.context.source(),
            model = predictor.context.classifier().name(),
            scaler = predictor.context.scaler().name(),
            probability_floor = floor,
            probability_ceiling = ceiling,
            threshold = predictor.engine.threshold(),
            "Predictor ready"
        );
        predictor
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    /// Predict one record. Failures after parsing become a fallback result
    /// carrying the error message.
    pub fn predict(&self, record: &ClinicalRecord) -> PredictionResult {
        match self.try_predict(record) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Prediction failed, returning fallback result");
                PredictionResult::fallback(self.fallback_probability, e)
            }
        }
    }

    /// Predict one record, surfacing the error instead of a fallback result
    pub fn try_predict(&self, record: &ClinicalRecord) -> Result<PredictionResult, PredictError> {
        let features = self.vectorizer.vectorize(record)?;
        let inference = self.engine.infer(&features, &self.context)?;
        Ok(PredictionResult::new(
            inference.label,
            inference.probability,
            inference.confidence,
        ))
    }
}

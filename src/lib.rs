//! Heart Disease Risk Predictor Library
//!
//! Turns a loosely typed clinical record into a heart-disease probability,
//! a binary label and a confidence tag. Trained artifacts are loaded from disk,
//! synthesized on first run when missing, or replaced by a rule-based model.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod types;
pub mod vectorizer;

pub use config::AppConfig;
pub use error::{ArtifactError, PredictError, TrainingError};
pub use models::inference::InferenceEngine;
pub use models::loader::{ModelContext, ModelLoader};
pub use predictor::Predictor;
pub use types::{ClinicalRecord, Confidence, PredictionResult};
pub use vectorizer::FeatureVectorizer;

//! Type definitions for the prediction pipeline

pub mod prediction;
pub mod record;

pub use prediction::{Confidence, PredictionResult};
pub use record::ClinicalRecord;

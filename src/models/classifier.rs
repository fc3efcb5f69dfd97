//! Classifier capability and its persisted variants

use crate::models::calibration::IsotonicCalibrator;
use crate::models::forest::{DecisionTree, RandomForest};
use crate::types::Confidence;
use serde::{Deserialize, Serialize};

/// Capability shared by every model the pipeline can run:
/// given a scaled feature vector, return the positive-class probability.
pub trait Classifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Width of the scaled vector the model expects
    fn n_features(&self) -> usize;

    /// Probability of heart disease for one scaled feature vector
    fn positive_probability(&self, features: &[f64]) -> f64;

    /// Confidence tag reported alongside this model's predictions
    fn confidence(&self) -> Confidence;
}

/// Trained classifier as persisted on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassifierArtifact {
    Forest {
        forest: RandomForest,
        calibrator: Option<IsotonicCalibrator>,
    },
    Tree(DecisionTree),
}

impl ClassifierArtifact {
    /// Check the structure of a decoded classifier before it is used for inference
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClassifierArtifact::Forest { forest, calibrator } => {
                forest.validate()?;
                match calibrator {
                    Some(calibrator) => calibrator.validate(),
                    None => Ok(()),
                }
            }
            ClassifierArtifact::Tree(tree) => tree.validate(),
        }
    }
}

impl Classifier for ClassifierArtifact {
    fn name(&self) -> &str {
        match self {
            ClassifierArtifact::Forest {
                calibrator: Some(_),
                ..
            } => "calibrated_random_forest",
            ClassifierArtifact::Forest { .. } => "random_forest",
            ClassifierArtifact::Tree(_) => "decision_tree",
        }
    }

    fn n_features(&self) -> usize {
        match self {
            ClassifierArtifact::Forest { forest, .. } => forest.n_features(),
            ClassifierArtifact::Tree(tree) => tree.n_features(),
        }
    }

    fn positive_probability(&self, features: &[f64]) -> f64 {
        match self {
            ClassifierArtifact::Forest { forest, calibrator } => {
                let raw = forest.predict_proba(features);
                match calibrator {
                    Some(calibrator) => calibrator.calibrate(raw),
                    None => raw,
                }
            }
            ClassifierArtifact::Tree(tree) => tree.predict_proba(features),
        }
    }

    fn confidence(&self) -> Confidence {
        match self {
            ClassifierArtifact::Forest { .. } => Confidence::High,
            ClassifierArtifact::Tree(_) => Confidence::Low,
        }
    }
}

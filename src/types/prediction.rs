//! Prediction result emitted on stdout

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much structure backs a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Trained ensemble
    High,
    /// Trained single model
    Low,
    /// Rule-based stand-in or failed prediction
    Fallback,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Low => "low",
            Confidence::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Binary label: 1 = heart disease predicted
    pub prediction: u8,

    /// Probability of the positive class
    pub probability: f64,

    /// Confidence tag of the model that produced the probability
    pub confidence: Confidence,

    /// Reason the prediction fell back, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    /// Create a successful prediction
    pub fn new(prediction: u8, probability: f64, confidence: Confidence) -> Self {
        Self {
            prediction,
            probability,
            confidence,
            error: None,
        }
    }

    /// Safe negative result carrying the reason the real prediction failed
    pub fn fallback(probability: f64, error: impl fmt::Display) -> Self {
        Self {
            prediction: 0,
            probability,
            confidence: Confidence::Fallback,
            error: Some(error.to_string()),
        }
    }

    /// Single-line JSON encoding for stdout
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

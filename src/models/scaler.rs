//! Feature scaling

use crate::error::PredictError;
use serde::{Deserialize, Serialize};

/// Capability to normalize a feature vector before classification
pub trait FeatureScaler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Transform raw features into the space the classifier was fit in
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError>;
}

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation of each column.
    ///
    /// Columns with zero variance get a scale of 1 so they transform to 0.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() {
            return Self {
                mean: Vec::new(),
                scale: Vec::new(),
            };
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, &x) in mean.iter_mut().zip(row.iter()) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((v, &x), &m) in var.iter_mut().zip(row.iter()).zip(mean.iter()) {
                let d = x - m;
                *v += d * d;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check the statistics of a decoded scaler
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler has {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err("scaler mean is not finite".to_string());
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scaler scale must be finite and positive".to_string());
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn name(&self) -> &str {
        "standard"
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError> {
        if features.len() != self.mean.len() || self.scale.len() != self.mean.len() {
            return Err(PredictError::ScalingDimensionMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }
}

/// Pass-through scaler paired with the rule-based classifier, whose rules
/// are written against raw clinical units.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScaler {
    n_features: usize,
}

impl IdentityScaler {
    pub fn new(n_features: usize) -> Self {
        Self { n_features }
    }
}

impl FeatureScaler for IdentityScaler {
    fn name(&self) -> &str {
        "identity"
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError> {
        if features.len() != self.n_features {
            return Err(PredictError::ScalingDimensionMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        Ok(features.to_vec())
    }
}

//! Feature vectorization for heart disease model inference.
//!
//! Maps a loosely-typed clinical record onto the fixed 13-feature layout the
//! scaler and classifier were fit on. The column order is defined once, in
//! [`FEATURES`], and is part of the artifact contract.

use crate::error::PredictError;
use crate::types::ClinicalRecord;
use serde_json::Value;
use std::ops::Index;
use tracing::debug;

/// Number of features the models consume.
pub const FEATURE_COUNT: usize = 13;

/// A clinical field and the value used when a record omits it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub default: f64,
}

/// Feature layout, in model column order.
pub const FEATURES: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec { name: "age", default: 50.0 },
    FeatureSpec { name: "sex", default: 0.0 },
    FeatureSpec { name: "cp", default: 0.0 },
    FeatureSpec { name: "trestbps", default: 120.0 },
    FeatureSpec { name: "chol", default: 200.0 },
    FeatureSpec { name: "fbs", default: 0.0 },
    FeatureSpec { name: "restecg", default: 0.0 },
    FeatureSpec { name: "thalach", default: 150.0 },
    FeatureSpec { name: "exang", default: 0.0 },
    FeatureSpec { name: "oldpeak", default: 0.0 },
    FeatureSpec { name: "slope", default: 0.0 },
    FeatureSpec { name: "ca", default: 0.0 },
    FeatureSpec { name: "thal", default: 0.0 },
];

/// Column index of a feature by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURES.iter().position(|f| f.name == name)
}

/// Fixed-order numeric encoding of a clinical record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Vector holding every documented default
    pub fn defaults() -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, spec) in values.iter_mut().zip(FEATURES.iter()) {
            *slot = spec.default;
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        self.0
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.0[i])
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Vectorizer that turns clinical records into model input features.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorizer;

impl FeatureVectorizer {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature vector for a record.
    ///
    /// Missing fields take their documented default. A field that is present but
    /// cannot be read as a finite number is an error; it is never defaulted.
    pub fn vectorize(&self, record: &ClinicalRecord) -> Result<FeatureVector, PredictError> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, spec) in values.iter_mut().zip(FEATURES.iter()) {
            *slot = match record.get(spec.name) {
                Some(value) => coerce(spec.name, value)?,
                None => spec.default,
            };
        }

        for name in record.field_names() {
            if feature_index(name).is_none() {
                debug!(field = %name, "Ignoring unknown clinical field");
            }
        }

        Ok(FeatureVector(values))
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURES.iter().map(|f| f.name).collect()
    }
}

fn coerce(field: &'static str, value: &Value) -> Result<f64, PredictError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(PredictError::FieldCoercion {
            field,
            value: value.to_string(),
        }),
    }
}

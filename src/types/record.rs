//! Clinical record as received from the caller

use crate::error::PredictError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unordered mapping of clinical field name to a loosely-typed value.
///
/// Fields may be missing, and values may arrive as numbers, numeric strings or booleans.
/// Interpretation is left to the [`FeatureVectorizer`](crate::FeatureVectorizer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicalRecord {
    fields: Map<String, Value>,
}

impl ClinicalRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a record from a JSON document, which must be an object
    pub fn from_json(input: &str) -> Result<Self, PredictError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| PredictError::MalformedInput(e.to_string()))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(PredictError::MalformedInput(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Set a field, replacing any previous value
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Names of all fields present in the record
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

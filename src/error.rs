//! Error types for the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Failures that can occur while turning one request into a prediction
#[derive(Debug, Error)]
pub enum PredictError {
    /// No JSON argument was supplied on the command line
    #[error("no input data provided")]
    ArgumentMissing,

    /// The argument was not a JSON object
    #[error("invalid JSON input: {0}")]
    MalformedInput(String),

    /// A clinical field was present but could not be read as a number
    #[error("field '{field}' has non-numeric value {value}")]
    FieldCoercion { field: &'static str, value: String },

    /// Scaler statistics and feature vector disagree on dimensionality
    #[error("scaler expects {expected} features but received {actual}")]
    ScalingDimensionMismatch { expected: usize, actual: usize },

    /// Classifier produced NaN or an infinite probability
    #[error("classifier returned invalid probability {0}")]
    InvalidProbability(f64),
}

/// Failures while reading or writing a persisted artifact.
///
/// These never escape the loader: it degrades to a synthesized or rule-based model.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt artifact {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("artifact {path} has format version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("artifact {path} holds a {found} but a {expected} was requested")]
    KindMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("artifact {path} was fit on {found} features, expected {expected}")]
    FeatureCountMismatch {
        path: PathBuf,
        found: usize,
        expected: usize,
    },

    #[error("failed to encode artifact: {0}")]
    Serialize(String),
}

/// Failures while building a dataset or fitting a model
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("dataset contains a single class; cannot fit a classifier")]
    SingleClass,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{0}' not found in dataset header")]
    MissingColumn(String),

    #[error("row {row}, column '{column}': invalid value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("failed to scale training rows: {0}")]
    Scaling(#[from] PredictError),
}

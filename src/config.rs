//! Configuration management for the prediction pipeline

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/predictor.toml";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`]
pub const CONFIG_PATH_ENV: &str = "HEART_RISK_CONFIG";

/// Prefix for per-key overrides, e.g. `HEART_RISK__MODELS__MODELS_DIR`
pub const ENV_PREFIX: &str = "HEART_RISK";

/// Kind of classifier produced by training
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Bagged random forest - reported with high confidence
    #[default]
    Forest,
    /// Single decision tree - reported with low confidence
    Tree,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub inference: InferenceConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Artifact location configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
    /// Directory searched before the executable's own directory
    #[serde(default)]
    pub models_dir: Option<String>,
    /// Alternate deployment directory, relative to the executable's directory
    pub alternate_dir: String,
    /// Classifier artifact file name
    pub model_file: String,
    /// Scaler artifact file name
    pub scaler_file: String,
    /// Train and persist a model when no usable artifact is found
    pub synthesize_on_missing: bool,
}

/// Post-processing applied to classifier output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    /// Lowest probability ever reported
    pub probability_floor: f64,
    /// Highest probability ever reported
    pub probability_ceiling: f64,
    /// Label is 1 when the clamped probability is strictly above this
    pub decision_threshold: f64,
    /// Probability reported when a prediction fails
    pub fallback_probability: f64,
}

/// Model fitting configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingConfig {
    pub model: ModelKind,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Rows in the generated cohort when no dataset is supplied
    pub synthetic_samples: usize,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Fit an isotonic calibrator on a held-out slice of the training rows
    pub calibrate: bool,
    pub seed: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from defaults, the optional config file and the environment
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration using a specific (optional) config file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(
                Config::try_from(&AppConfig::default())
                    .context("Failed to build default configuration")?,
            )
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.inference.validate()?;
        Ok(config)
    }
}

impl InferenceConfig {
    /// Reject bounds that would make clamping panic or report a probability outside [0, 1]
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);

        ensure!(
            in_unit(self.probability_floor) && in_unit(self.probability_ceiling),
            "inference probability bounds must lie in [0, 1], got [{}, {}]",
            self.probability_floor,
            self.probability_ceiling
        );
        ensure!(
            self.probability_floor <= self.probability_ceiling,
            "inference probability_floor {} is above probability_ceiling {}",
            self.probability_floor,
            self.probability_ceiling
        );
        ensure!(
            in_unit(self.decision_threshold),
            "inference decision_threshold must lie in [0, 1], got {}",
            self.decision_threshold
        );
        ensure!(
            in_unit(self.fallback_probability),
            "inference fallback_probability must lie in [0, 1], got {}",
            self.fallback_probability
        );
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig {
                models_dir: None,
                alternate_dir: "../server".to_string(),
                model_file: "heart_disease_model.bin".to_string(),
                scaler_file: "heart_disease_scaler.bin".to_string(),
                synthesize_on_missing: true,
            },
            inference: InferenceConfig::default(),
            training: TrainingConfig::default(),
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            probability_floor: 0.05,
            probability_ceiling: 0.95,
            decision_threshold: 0.5,
            fallback_probability: 0.1,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Forest,
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            synthetic_samples: 1000,
            test_fraction: 0.2,
            calibrate: false,
            seed: 42,
        }
    }
}

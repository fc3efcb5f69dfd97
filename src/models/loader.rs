//! Artifact discovery and loading.
//!
//! Candidate directories are produced by an ordered list of [`ArtifactLocator`]s.
//! Loading never fails: missing or unreadable artifacts degrade to a freshly
//! synthesized model, and if that fails too, to the rule-based fallback.

use crate::config::{AppConfig, TrainingConfig};
use crate::error::{ArtifactError, TrainingError};
use crate::models::artifact::Artifact;
use crate::models::classifier::{Classifier, ClassifierArtifact};
use crate::models::fallback::RuleBasedClassifier;
use crate::models::scaler::{FeatureScaler, IdentityScaler, StandardScaler};
use crate::models::trainer::{TrainedModel, Trainer};
use crate::types::Confidence;
use crate::vectorizer::FEATURE_COUNT;
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One place artifacts may live
pub trait ArtifactLocator: Send + Sync {
    /// Directory to search, if this locator applies in the current environment
    fn resolve(&self) -> Option<PathBuf>;

    /// Description for logs
    fn describe(&self) -> String;
}

/// A fixed directory
#[derive(Debug, Clone)]
pub struct FixedDirectory(pub PathBuf);

impl ArtifactLocator for FixedDirectory {
    fn resolve(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("directory {}", self.0.display())
    }
}

/// A directory relative to the running executable
#[derive(Debug, Clone)]
pub struct ExecutableRelative {
    relative: PathBuf,
}

impl ExecutableRelative {
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
        }
    }

    /// The executable's own directory
    pub fn colocated() -> Self {
        Self::new("")
    }
}

impl ArtifactLocator for ExecutableRelative {
    fn resolve(&self) -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let dir = exe.parent()?;
        if self.relative.as_os_str().is_empty() {
            Some(dir.to_path_buf())
        } else {
            Some(dir.join(&self.relative))
        }
    }

    fn describe(&self) -> String {
        format!("executable directory + {:?}", self.relative)
    }
}

/// Where the models in a [`ModelContext`] came from
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Loaded {
        directory: PathBuf,
        model_id: String,
    },
    Synthesized {
        model_id: String,
        /// Directory the new artifacts were written to, if persisting succeeded
        persisted_to: Option<PathBuf>,
    },
    Fallback,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Loaded { directory, .. } => write!(f, "loaded from {}", directory.display()),
            ModelSource::Synthesized { .. } => f.write_str("synthesized"),
            ModelSource::Fallback => f.write_str("rule-based fallback"),
        }
    }
}

/// Classifier and scaler selected for this process
pub struct ModelContext {
    classifier: Box<dyn Classifier>,
    scaler: Box<dyn FeatureScaler>,
    source: ModelSource,
}

impl ModelContext {
    pub fn new(
        classifier: Box<dyn Classifier>,
        scaler: Box<dyn FeatureScaler>,
        source: ModelSource,
    ) -> Self {
        Self {
            classifier,
            scaler,
            source,
        }
    }

    /// Rule-based classifier over raw (unscaled) features
    pub fn fallback() -> Self {
        Self::new(
            Box::new(RuleBasedClassifier::new()),
            Box::new(IdentityScaler::new(FEATURE_COUNT)),
            ModelSource::Fallback,
        )
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &dyn FeatureScaler {
        self.scaler.as_ref()
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn confidence(&self) -> Confidence {
        self.classifier.confidence()
    }
}

impl fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("classifier", &self.classifier.name())
            .field("scaler", &self.scaler.name())
            .field("source", &self.source)
            .finish()
    }
}

/// Locates, loads and if necessary creates the model pair
pub struct ModelLoader {
    locators: Vec<Box<dyn ArtifactLocator>>,
    model_file: String,
    scaler_file: String,
    synthesize_on_missing: bool,
    training: TrainingConfig,
}

impl ModelLoader {
    /// Loader searching the given locators in order
    pub fn new(locators: Vec<Box<dyn ArtifactLocator>>) -> Self {
        let defaults = AppConfig::default();
        Self {
            locators,
            model_file: defaults.models.model_file,
            scaler_file: defaults.models.scaler_file,
            synthesize_on_missing: defaults.models.synthesize_on_missing,
            training: defaults.training,
        }
    }

    /// Configured directory (if any), then the executable's directory, then the
    /// alternate deployment directory.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut locators: Vec<Box<dyn ArtifactLocator>> = Vec::new();
        if let Some(dir) = &config.models.models_dir {
            locators.push(Box::new(FixedDirectory(PathBuf::from(dir))));
        }
        locators.push(Box::new(ExecutableRelative::colocated()));
        locators.push(Box::new(ExecutableRelative::new(&config.models.alternate_dir)));

        Self::new(locators)
            .with_file_names(&config.models.model_file, &config.models.scaler_file)
            .with_synthesis(config.models.synthesize_on_missing, config.training.clone())
    }

    pub fn with_file_names(mut self, model_file: &str, scaler_file: &str) -> Self {
        self.model_file = model_file.to_string();
        self.scaler_file = scaler_file.to_string();
        self
    }

    pub fn with_synthesis(mut self, enabled: bool, training: TrainingConfig) -> Self {
        self.synthesize_on_missing = enabled;
        self.training = training;
        self
    }

    /// Candidate directories in search order
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        self.locators
            .iter()
            .filter_map(|locator| {
                let dir = locator.resolve();
                if dir.is_none() {
                    debug!(locator = %locator.describe(), "Locator does not apply");
                }
                dir
            })
            .collect()
    }

    /// Build the model context for this process
    pub fn load(&self) -> ModelContext {
        match self.load_existing() {
            Ok(context) => return context,
            Err(e) => warn!(error = %e, "No usable model artifacts found"),
        }

        if !self.synthesize_on_missing {
            warn!("Model synthesis disabled, using rule-based fallback");
            return ModelContext::fallback();
        }

        match self.synthesize() {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Model synthesis failed, using rule-based fallback");
                ModelContext::fallback()
            }
        }
    }

    /// Load the first readable pair from the candidate directories
    pub fn load_existing(&self) -> Result<ModelContext, ArtifactError> {
        let dirs = self.candidate_dirs();
        let mut last_error = None;

        for dir in &dirs {
            let model_path = dir.join(&self.model_file);
            if !model_path.exists() {
                debug!(path = %model_path.display(), "Model artifact not present");
                continue;
            }

            match self.load_pair(dir) {
                Ok((classifier, scaler)) => {
                    if classifier.header.model_id != scaler.header.model_id {
                        warn!(
                            directory = %dir.display(),
                            model_id = %classifier.header.model_id,
                            scaler_model_id = %scaler.header.model_id,
                            "Classifier and scaler come from different training runs"
                        );
                    }
                    info!(
                        directory = %dir.display(),
                        model = classifier.payload.name(),
                        model_id = %classifier.header.model_id,
                        trained_at = %classifier.header.trained_at,
                        "Model artifacts loaded"
                    );
                    let source = ModelSource::Loaded {
                        directory: dir.clone(),
                        model_id: classifier.header.model_id.clone(),
                    };
                    return Ok(ModelContext::new(
                        Box::new(classifier.payload),
                        Box::new(scaler.payload),
                        source,
                    ));
                }
                Err(e) => {
                    warn!(directory = %dir.display(), error = %e, "Failed to load model artifacts, skipping");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            let first = dirs.first().cloned().unwrap_or_default();
            ArtifactError::Missing(first.join(&self.model_file))
        }))
    }

    /// Load the classifier and scaler stored in one directory
    pub fn load_pair(
        &self,
        dir: &Path,
    ) -> Result<(Artifact<ClassifierArtifact>, Artifact<StandardScaler>), ArtifactError> {
        let classifier = Artifact::<ClassifierArtifact>::load(dir.join(&self.model_file), FEATURE_COUNT)?;
        let scaler = Artifact::<StandardScaler>::load(dir.join(&self.scaler_file), FEATURE_COUNT)?;
        Ok((classifier, scaler))
    }

    /// Train a new pair on the synthetic cohort and persist it to the first candidate
    /// directory. Persisting is best-effort.
    pub fn synthesize(&self) -> Result<ModelContext, TrainingError> {
        info!(
            samples = self.training.synthetic_samples,
            n_estimators = self.training.n_estimators,
            "Training model on synthetic cohort"
        );
        let trained = Trainer::new(self.training.clone()).train_synthetic()?;
        let model_id = uuid::Uuid::new_v4().to_string();

        let persisted_to = match self.candidate_dirs().into_iter().next() {
            Some(dir) => match self.persist(&dir, &trained, &model_id) {
                Ok(()) => {
                    info!(
                        directory = %dir.display(),
                        model_id = %model_id,
                        accuracy = trained.report.accuracy,
                        "Synthesized model saved"
                    );
                    Some(dir)
                }
                Err(e) => {
                    warn!(directory = %dir.display(), error = %e, "Failed to save synthesized model");
                    None
                }
            },
            None => {
                warn!("No candidate directory available, synthesized model not saved");
                None
            }
        };

        Ok(ModelContext::new(
            Box::new(trained.classifier),
            Box::new(trained.scaler),
            ModelSource::Synthesized {
                model_id,
                persisted_to,
            },
        ))
    }

    /// Write a trained pair into `dir`.
    ///
    /// The scaler is written first: a directory that holds a new classifier file
    /// always holds the scaler from the same run.
    pub fn persist(
        &self,
        dir: &Path,
        trained: &TrainedModel,
        model_id: &str,
    ) -> Result<(), ArtifactError> {
        let trained_at = Utc::now();
        Artifact::new(trained.scaler.clone(), model_id, trained_at)
            .save(dir.join(&self.scaler_file))?;
        Artifact::new(trained.classifier.clone(), model_id, trained_at)
            .save(dir.join(&self.model_file))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_training() -> TrainingConfig {
        TrainingConfig {
            n_estimators: 10,
            synthetic_samples: 300,
            ..TrainingConfig::default()
        }
    }

    fn loader_for(dirs: &[&Path], synthesize: bool) -> ModelLoader {
        let locators: Vec<Box<dyn ArtifactLocator>> = dirs
            .iter()
            .map(|d| Box::new(FixedDirectory(d.to_path_buf())) as Box<dyn ArtifactLocator>)
            .collect();
        ModelLoader::new(locators).with_synthesis(synthesize, small_training())
    }

    fn probability(context: &ModelContext, features: &[f64]) -> f64 {
        let scaled = context.scaler().transform(features).unwrap();
        context.classifier().positive_probability(&scaled)
    }

    const PATIENT: [f64; FEATURE_COUNT] = [
        67.0, 1.0, 2.0, 160.0, 286.0, 0.0, 2.0, 108.0, 1.0, 1.5, 1.0, 3.0, 2.0,
    ];

    #[test]
    fn test_missing_artifacts_without_synthesis_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let context = loader_for(&[dir.path()], false).load();

        assert_eq!(context.source(), &ModelSource::Fallback);
        assert_eq!(context.confidence(), Confidence::Fallback);
    }

    #[test]
    fn test_synthesized_model_is_persisted_and_reloaded_identically() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(&[dir.path()], true);

        let first = loader.load();
        match first.source() {
            ModelSource::Synthesized { persisted_to, .. } => {
                assert_eq!(persisted_to.as_deref(), Some(dir.path()));
            }
            other => panic!("expected synthesized model, got {other:?}"),
        }
        assert!(dir.path().join("heart_disease_model.bin").exists());
        assert!(dir.path().join("heart_disease_scaler.bin").exists());

        let second = loader.load();
        assert!(matches!(second.source(), ModelSource::Loaded { .. }));
        assert_eq!(second.confidence(), Confidence::High);

        let p1 = probability(&first, &PATIENT);
        let p2 = probability(&second, &PATIENT);
        assert_eq!(p1.to_bits(), p2.to_bits());
    }

    #[test]
    fn test_corrupt_first_candidate_skipped() {
        let corrupt = tempfile::tempdir().unwrap();
        let good = tempfile::tempdir().unwrap();

        std::fs::write(corrupt.path().join("heart_disease_model.bin"), b"garbage").unwrap();
        std::fs::write(corrupt.path().join("heart_disease_scaler.bin"), b"garbage").unwrap();

        let trainer_loader = loader_for(&[good.path()], true);
        let trained = Trainer::new(small_training()).train_synthetic().unwrap();
        trainer_loader.persist(good.path(), &trained, "run-7").unwrap();

        let context = loader_for(&[corrupt.path(), good.path()], false).load();
        assert_eq!(
            context.source(),
            &ModelSource::Loaded {
                directory: good.path().to_path_buf(),
                model_id: "run-7".to_string(),
            }
        );
    }

    #[test]
    fn test_corrupt_only_candidate_without_synthesis_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("heart_disease_model.bin"), b"garbage").unwrap();

        let loader = loader_for(&[dir.path()], false);
        assert!(matches!(
            loader.load_existing(),
            Err(ArtifactError::Corrupt { .. })
        ));
        assert_eq!(loader.load().source(), &ModelSource::Fallback);
    }

    #[test]
    fn test_tree_with_out_of_range_split_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainingConfig {
            model: crate::config::ModelKind::Tree,
            ..small_training()
        };
        let mut trained = Trainer::new(config).train_synthetic().unwrap();

        let mut encoded = serde_json::to_value(&trained.classifier).unwrap();
        encoded["Tree"]["nodes"][0]["Split"]["feature"] = serde_json::json!(40);
        trained.classifier = serde_json::from_value(encoded).unwrap();

        let loader = loader_for(&[dir.path()], false);
        loader.persist(dir.path(), &trained, "run-9").unwrap();

        assert!(matches!(
            loader.load_existing(),
            Err(ArtifactError::Corrupt { .. })
        ));
        let context = loader.load();
        assert_eq!(context.source(), &ModelSource::Fallback);
        assert!(probability(&context, &PATIENT).is_finite());
    }

    #[test]
    fn test_persist_failure_still_returns_model() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();

        let context = loader_for(&[blocker.join("models").as_path()], true).load();
        match context.source() {
            ModelSource::Synthesized { persisted_to, .. } => assert!(persisted_to.is_none()),
            other => panic!("expected synthesized model, got {other:?}"),
        }
        assert_eq!(context.confidence(), Confidence::High);
    }

    #[test]
    fn test_custom_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_for(&[dir.path()], true).with_file_names("m.bin", "s.bin");
        loader.load();
        assert!(dir.path().join("m.bin").exists());
        assert!(dir.path().join("s.bin").exists());
    }

    #[test]
    fn test_from_config_candidate_order() {
        let mut config = AppConfig::default();
        config.models.models_dir = Some("/opt/heart/models".to_string());
        let dirs = ModelLoader::from_config(&config).candidate_dirs();

        assert_eq!(dirs.len(), 3);
        assert_eq!(dirs[0], PathBuf::from("/opt/heart/models"));
        assert_eq!(dirs[2], dirs[1].join("../server"));
    }
}

//! Dataset handling and model fitting.
//!
//! Used by the loader to synthesize a first-run model and by the offline
//! `train_model` tool to fit artifacts from a labelled CSV.

use crate::config::{ModelKind, TrainingConfig};
use crate::error::TrainingError;
use crate::metrics::EvaluationReport;
use crate::models::calibration::IsotonicCalibrator;
use crate::models::classifier::{Classifier, ClassifierArtifact};
use crate::models::forest::{DecisionTree, ForestParams, RandomForest, TreeParams};
use crate::models::scaler::{FeatureScaler, StandardScaler};
use crate::vectorizer::{FEATURES, FEATURE_COUNT};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::{debug, info};

/// Name of the label column in training CSV files
pub const TARGET_COLUMN: &str = "target";

/// Labelled rows in model column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Generate a synthetic cohort whose label follows a weighted count of risk factors.
    pub fn synthetic(n_samples: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = Vec::with_capacity(n_samples);
        let mut labels = Vec::with_capacity(n_samples);

        for _ in 0..n_samples {
            let age = rng.gen_range(20..80) as f64;
            let sex = rng.gen_range(0..2) as f64;
            let cp = rng.gen_range(0..4) as f64;
            let trestbps = rng.gen_range(80..200) as f64;
            let chol = rng.gen_range(100..400) as f64;
            let fbs = rng.gen_range(0..2) as f64;
            let restecg = rng.gen_range(0..3) as f64;
            let thalach = rng.gen_range(60..200) as f64;
            let exang = rng.gen_range(0..2) as f64;
            let oldpeak = rng.gen_range(0.0..6.0);
            let slope = rng.gen_range(0..3) as f64;
            let ca = rng.gen_range(0..5) as f64;
            let thal = rng.gen_range(0..4) as f64;

            let risk_factors = [
                (age > 60.0, 0.3),
                (sex == 1.0, 0.2),
                (cp > 1.0, 0.4),
                (trestbps > 140.0, 0.3),
                (chol > 250.0, 0.3),
                (fbs == 1.0, 0.2),
                (thalach < 120.0, 0.3),
                (exang == 1.0, 0.4),
                (oldpeak > 2.0, 0.3),
            ];
            let score: f64 = risk_factors
                .iter()
                .filter(|(hit, _)| *hit)
                .map(|(_, w)| w)
                .sum();

            rows.push(vec![
                age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak, slope, ca,
                thal,
            ]);
            labels.push(u8::from(score > 1.5));
        }

        Self { rows, labels }
    }

    /// Load a labelled dataset from CSV.
    ///
    /// The header must name all 13 feature columns (in any order) and a
    /// `target` column; other columns are ignored. Targets other than 0 are
    /// read as the positive class.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, TrainingError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| TrainingError::MissingColumn(name.to_string()))
        };
        let feature_cols = FEATURES
            .iter()
            .map(|f| position(f.name))
            .collect::<Result<Vec<_>, _>>()?;
        let target_col = position(TARGET_COLUMN)?;

        let mut dataset = Dataset::default();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row_number = i + 2; // header is line 1
            let cell = |col: usize, name: &str| -> Result<f64, TrainingError> {
                let raw = record.get(col).unwrap_or("");
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| TrainingError::InvalidValue {
                        row: row_number,
                        column: name.to_string(),
                        value: raw.to_string(),
                    })
            };

            let row = feature_cols
                .iter()
                .zip(FEATURES.iter())
                .map(|(&col, spec)| cell(col, spec.name))
                .collect::<Result<Vec<_>, _>>()?;
            let target = cell(target_col, TARGET_COLUMN)?;

            dataset.rows.push(row);
            dataset.labels.push(u8::from(target != 0.0));
        }

        info!(
            rows = dataset.len(),
            positives = dataset.positives(),
            "Loaded training dataset"
        );
        Ok(dataset)
    }

    /// Split into (train, test) keeping the class balance of each split close to the whole
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> (Dataset, Dataset) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Dataset::default();
        let mut test = Dataset::default();

        for class in [0u8, 1u8] {
            let mut members: Vec<usize> = (0..self.len())
                .filter(|&i| self.labels[i] == class)
                .collect();
            members.shuffle(&mut rng);

            let n_test = (members.len() as f64 * test_fraction.clamp(0.0, 1.0)).round() as usize;
            for (k, &i) in members.iter().enumerate() {
                let target = if k < n_test { &mut test } else { &mut train };
                target.rows.push(self.rows[i].clone());
                target.labels.push(class);
            }
        }

        (train, test)
    }

    fn check_trainable(&self) -> Result<(), TrainingError> {
        if self.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        let positives = self.positives();
        if positives == 0 || positives == self.len() {
            return Err(TrainingError::SingleClass);
        }
        Ok(())
    }
}

/// Output of one training run
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub classifier: ClassifierArtifact,
    pub scaler: StandardScaler,
    /// Metrics on the held-out test split
    pub report: EvaluationReport,
}

/// Fits a scaler and classifier pair
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on the synthetic cohort
    pub fn train_synthetic(&self) -> Result<TrainedModel, TrainingError> {
        let dataset = Dataset::synthetic(self.config.synthetic_samples, self.config.seed);
        self.train(&dataset)
    }

    /// Split, scale, fit and evaluate
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedModel, TrainingError> {
        dataset.check_trainable()?;
        if dataset.rows.iter().any(|r| r.len() != FEATURE_COUNT) {
            return Err(TrainingError::InvalidValue {
                row: 0,
                column: "*".to_string(),
                value: format!("expected {FEATURE_COUNT} features per row"),
            });
        }

        let (train, test) = dataset.stratified_split(self.config.test_fraction, self.config.seed);
        train.check_trainable()?;

        let scaler = StandardScaler::fit(&train.rows);
        let train_scaled = scale_rows(&scaler, &train.rows)?;
        let test_scaled = scale_rows(&scaler, &test.rows)?;

        let classifier = if self.config.calibrate && self.config.model == ModelKind::Forest {
            self.fit_calibrated_forest(&train, train_scaled)?
        } else {
            self.fit_classifier(&train_scaled, &train.labels)
        };

        let probabilities: Vec<f64> = test_scaled
            .iter()
            .map(|row| classifier.positive_probability(row))
            .collect();
        let report = EvaluationReport::evaluate(&probabilities, &test.labels, 0.5);

        info!(
            model = classifier.name(),
            train_rows = train.len(),
            test_rows = test.len(),
            accuracy = report.accuracy,
            "Model trained"
        );

        Ok(TrainedModel {
            classifier,
            scaler,
            report,
        })
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: None,
        }
    }

    fn fit_forest(&self, rows: &[Vec<f64>], labels: &[u8]) -> RandomForest {
        let params = ForestParams {
            n_estimators: self.config.n_estimators,
            tree: self.tree_params(),
            seed: self.config.seed,
        };
        RandomForest::fit(rows, labels, &params)
    }

    fn fit_classifier(&self, rows: &[Vec<f64>], labels: &[u8]) -> ClassifierArtifact {
        match self.config.model {
            ModelKind::Forest => ClassifierArtifact::Forest {
                forest: self.fit_forest(rows, labels),
                calibrator: None,
            },
            ModelKind::Tree => ClassifierArtifact::Tree(DecisionTree::fit(
                rows,
                labels,
                &self.tree_params(),
                self.config.seed,
            )),
        }
    }

    /// Fit the forest on part of the training split and the calibrator on the rest
    fn fit_calibrated_forest(
        &self,
        train: &Dataset,
        train_scaled: Vec<Vec<f64>>,
    ) -> Result<ClassifierArtifact, TrainingError> {
        let scaled = Dataset {
            rows: train_scaled,
            labels: train.labels.clone(),
        };
        let (fit, calibration) = scaled.stratified_split(0.2, self.config.seed.wrapping_add(1));
        fit.check_trainable()?;

        let forest = self.fit_forest(&fit.rows, &fit.labels);
        let scores: Vec<f64> = calibration
            .rows
            .iter()
            .map(|row| forest.predict_proba(row))
            .collect();
        let calibrator = IsotonicCalibrator::fit(&scores, &calibration.labels);

        debug!(
            fit_rows = fit.len(),
            calibration_rows = calibration.len(),
            breakpoints = calibrator.thresholds.len(),
            "Calibrator fitted"
        );

        Ok(ClassifierArtifact::Forest {
            forest,
            calibrator: Some(calibrator),
        })
    }
}

fn scale_rows(scaler: &StandardScaler, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TrainingError> {
    rows.iter()
        .map(|row| scaler.transform(row).map_err(TrainingError::from))
        .collect()
}

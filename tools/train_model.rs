//! Offline Model Trainer
//!
//! Fits the scaler and classifier artifacts from a labelled CSV, or from the
//! synthetic cohort, and writes them where the predictor looks for them.
//!
//! Usage: train_model [dataset.csv|synthetic] [output_dir]

use anyhow::{Context, Result};
use heart_risk_predictor::{
    config::AppConfig,
    logging,
    models::{Dataset, ModelLoader, Trainer},
};
use std::path::PathBuf;
use tracing::{info, warn};

fn main() -> Result<()> {
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load configuration, using defaults: {:#}", e);
        AppConfig::default()
    });
    // Logs are useful here; stdout carries the report, not a JSON contract
    if config.logging.level == "warn" {
        config.logging.level = "info".to_string();
    }
    logging::init(
        &config.logging,
        &["heart_risk_predictor", env!("CARGO_CRATE_NAME")],
    )?;

    info!("Starting Model Trainer");

    let args: Vec<String> = std::env::args().collect();
    let source = args.get(1).map(|s| s.as_str()).unwrap_or("synthetic");
    let output_dir = PathBuf::from(args.get(2).map(|s| s.as_str()).unwrap_or("."));

    config.training.calibrate = true;

    let dataset = if source == "synthetic" {
        info!(
            samples = config.training.synthetic_samples,
            seed = config.training.seed,
            "Generating synthetic cohort"
        );
        Dataset::synthetic(config.training.synthetic_samples, config.training.seed)
    } else {
        Dataset::from_csv(source).with_context(|| format!("Failed to load dataset {}", source))?
    };

    info!(
        rows = dataset.len(),
        positives = dataset.positives(),
        "Dataset loaded"
    );
    if dataset.len() < 50 {
        warn!(rows = dataset.len(), "Very small dataset, metrics will be noisy");
    }

    let trainer = Trainer::new(config.training.clone());
    info!(
        model = ?trainer.config().model,
        n_estimators = trainer.config().n_estimators,
        max_depth = trainer.config().max_depth,
        calibrate = trainer.config().calibrate,
        "Training"
    );
    let trained = trainer.train(&dataset).context("Training failed")?;

    trained.report.print_summary();

    let model_id = uuid::Uuid::new_v4().to_string();
    ModelLoader::from_config(&config)
        .persist(&output_dir, &trained, &model_id)
        .with_context(|| format!("Failed to write artifacts to {}", output_dir.display()))?;

    info!(
        output_dir = %output_dir.display(),
        model_file = %config.models.model_file,
        scaler_file = %config.models.scaler_file,
        model_id = %model_id,
        "Artifacts saved"
    );

    Ok(())
}

//! End-to-end tests for the offline trainer binary

use heart_risk_predictor::models::loader::{ArtifactLocator, FixedDirectory, ModelSource};
use heart_risk_predictor::{ClinicalRecord, Confidence, ModelLoader, Predictor, AppConfig};
use std::path::Path;
use std::process::{Command, Output};

fn train(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_train_model"))
        .env("HEART_RISK_CONFIG", config_dir.join("absent.toml"))
        .env("HEART_RISK__TRAINING__N_ESTIMATORS", "10")
        .env("HEART_RISK__TRAINING__SYNTHETIC_SAMPLES", "300")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run train_model binary")
}

#[test]
fn test_synthetic_training_writes_loadable_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("models");
    let output = train(&["synthetic", out.to_str().unwrap()], dir.path());

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = String::from_utf8_lossy(&output.stdout);
    assert!(report.contains("EVALUATION"));
    assert!(report.contains("Accuracy"));

    let loader = ModelLoader::new(vec![
        Box::new(FixedDirectory(out.clone())) as Box<dyn ArtifactLocator>
    ]);
    let (classifier, scaler) = loader.load_pair(&out).unwrap();
    assert_eq!(classifier.header.model_id, scaler.header.model_id);

    let context = loader.load();
    assert!(matches!(context.source(), ModelSource::Loaded { .. }));
    assert_eq!(context.confidence(), Confidence::High);
    assert_eq!(context.classifier().name(), "calibrated_random_forest");

    let result = Predictor::new(context, &AppConfig::default()).predict(&ClinicalRecord::new());
    assert!(result.error.is_none());
    assert!((0.05..=0.95).contains(&result.probability));
}

#[test]
fn test_csv_training() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("heart.csv");
    let mut content =
        String::from("age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target\n");
    for i in 0..120 {
        let sick = i % 2 == 0;
        let (age, cp, thalach) = if sick { (65 + i % 10, 3, 100) } else { (40 + i % 10, 0, 170) };
        content.push_str(&format!(
            "{age},{},{cp},130,220,0,0,{thalach},0,1.0,1,0,2,{}\n",
            i % 2,
            u8::from(sick)
        ));
    }
    std::fs::write(&csv, content).unwrap();

    let out = dir.path().join("csv_models");
    let output = train(&[csv.to_str().unwrap(), out.to_str().unwrap()], dir.path());

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(out.join("heart_disease_model.bin").exists());
    assert!(out.join("heart_disease_scaler.bin").exists());
}

#[test]
fn test_missing_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.csv");
    let out = dir.path().join("models");
    let output = train(&[missing.to_str().unwrap(), out.to_str().unwrap()], dir.path());

    assert!(!output.status.success());
    assert!(!out.join("heart_disease_model.bin").exists());
}

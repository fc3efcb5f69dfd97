//! End-to-end tests driving the compiled predictor binary

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn predictor(models_dir: &Path, synthesize: bool) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_heart-risk-predictor"));
    cmd.env("HEART_RISK_CONFIG", models_dir.join("absent.toml"))
        .env("HEART_RISK__MODELS__MODELS_DIR", models_dir)
        .env(
            "HEART_RISK__MODELS__SYNTHESIZE_ON_MISSING",
            if synthesize { "true" } else { "false" },
        )
        .env("HEART_RISK__TRAINING__N_ESTIMATORS", "10")
        .env("HEART_RISK__TRAINING__SYNTHETIC_SAMPLES", "300")
        .env_remove("RUST_LOG");
    cmd
}

fn run(models_dir: &Path, synthesize: bool, args: &[&str]) -> Output {
    predictor(models_dir, synthesize)
        .args(args)
        .output()
        .expect("failed to run predictor binary")
}

fn single_json_line(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {stdout:?}");
    serde_json::from_str(lines[0]).unwrap()
}

#[test]
fn test_missing_argument_fails_without_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), false, &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: no input data provided"), "stderr: {stderr}");
}

#[test]
fn test_malformed_json_fails_without_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), false, &["{not json"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error: invalid JSON input"));
}

#[test]
fn test_non_object_json_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), false, &["[63, 1, 3]"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_fallback_model_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        dir.path(),
        false,
        &[r#"{"age": 70, "sex": 1, "cp": 3, "trestbps": 160, "chol": 300, "thalach": 90}"#],
    );

    assert!(output.status.success());
    let result = single_json_line(&output);
    assert_eq!(result["prediction"], 1);
    assert_eq!(result["probability"], 0.9);
    assert_eq!(result["confidence"], "fallback");
    assert!(result.get("error").is_none());
}

#[test]
fn test_coercion_error_reported_in_result() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), false, &[r#"{"age": "abc", "sex": 1}"#]);

    assert!(output.status.success());
    let result = single_json_line(&output);
    assert_eq!(result["prediction"], 0);
    assert_eq!(result["probability"], 0.1);
    assert_eq!(result["confidence"], "fallback");
    assert!(result["error"].as_str().unwrap().contains("age"));
}

#[test]
fn test_first_run_synthesizes_and_second_run_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let record = r#"{"age": 63, "sex": 1, "cp": 3, "trestbps": 145, "chol": 233, "fbs": 1, "restecg": 0, "thalach": 150, "exang": 0, "oldpeak": 2.3, "slope": 0, "ca": 0, "thal": 1}"#;

    let first = run(dir.path(), true, &[record]);
    assert!(first.status.success());
    let first = single_json_line(&first);
    assert_eq!(first["confidence"], "high");
    assert!(dir.path().join("heart_disease_model.bin").exists());
    assert!(dir.path().join("heart_disease_scaler.bin").exists());

    let probability = first["probability"].as_f64().unwrap();
    assert!((0.05..=0.95).contains(&probability));
    let expected_label = if probability > 0.5 { 1 } else { 0 };
    assert_eq!(first["prediction"], expected_label);

    let second = run(dir.path(), true, &[record]);
    assert!(second.status.success());
    let second = single_json_line(&second);
    assert_eq!(second["probability"], first["probability"]);
    assert_eq!(second["prediction"], first["prediction"]);
}

#[test]
fn test_extra_arguments_ignored_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), false, &[r#"{"age": 45}"#, "surplus", "more"]);

    assert!(output.status.success());
    let result = single_json_line(&output);
    assert_eq!(result["prediction"], 0);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Ignoring extra arguments"));
}

#[test]
fn test_json_logs_go_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let output = predictor(dir.path(), false)
        .env("HEART_RISK__LOGGING__LEVEL", "info")
        .env("HEART_RISK__LOGGING__FORMAT", "json")
        .arg(r#"{"age": 45}"#)
        .output()
        .unwrap();

    assert!(output.status.success());
    single_json_line(&output);

    let stderr = String::from_utf8(output.stderr).unwrap();
    let events: Vec<Value> = stderr
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(events
        .iter()
        .any(|e| e["fields"]["message"] == "Predictor ready"));
}

//! Heart Disease Risk Predictor - Main Entry Point
//!
//! Reads one clinical record as a JSON object argument and prints one JSON result
//! line on stdout. Diagnostics go to stderr.

use heart_risk_predictor::{
    config::AppConfig, logging, ClinicalRecord, PredictError, Predictor,
};
use std::process::ExitCode;
use tracing::{debug, error, warn};

fn main() -> ExitCode {
    // Configuration problems never block a prediction
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    if let Err(e) = logging::init(&config.logging, &[env!("CARGO_CRATE_NAME")]) {
        eprintln!("Warning: {:#}", e);
    }
    if let Some(e) = config_error {
        warn!(error = %format!("{:#}", e), "Failed to load configuration, using defaults");
    }

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(input) => input,
        None => return reject(PredictError::ArgumentMissing),
    };
    let extra = args.count();
    if extra > 0 {
        warn!(extra_arguments = extra, "Ignoring extra arguments");
    }

    let record = match ClinicalRecord::from_json(&input) {
        Ok(record) => record,
        Err(e) => return reject(e),
    };
    debug!(fields = record.len(), "Input record parsed");

    let predictor = Predictor::from_config(&config);
    let result = predictor.predict(&record);

    match result.to_json_line() {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to encode prediction result");
            eprintln!("Error: failed to encode prediction result: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Input-shape failure: report on stderr, print nothing on stdout
fn reject(err: PredictError) -> ExitCode {
    eprintln!("Error: {}", err);
    ExitCode::FAILURE
}

//! Data drift check between a reference and a current CSV.
//!
//! Exits 0 when no feature drifted and 1 when drift is detected or the
//! check could not run.

use clap::Parser;
use fraud_ml_pipeline::{config::LoggingConfig, drift, telemetry, DriftReport, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "detect-drift",
    about = "Detect data drift between two datasets with KS and chi-squared tests"
)]
struct Args {
    /// Reference CSV
    #[arg(long)]
    reference: PathBuf,

    /// Current CSV
    #[arg(long)]
    current: PathBuf,

    /// Where to write the JSON report
    #[arg(long = "report_path", default_value = "drift_report.json")]
    report_path: PathBuf,

    /// Significance level (p-value threshold)
    #[arg(long, default_value_t = drift::DEFAULT_ALPHA)]
    alpha: f64,
}

/// Log the outcome of a drift check and map it to the process exit code:
/// 0 without drift, 1 on drift or when the check failed.
fn exit_status(outcome: &Result<DriftReport>) -> u8 {
    match outcome {
        Ok(report) if report.drift_detected => {
            warn!(
                drifted = report.drifted_features_count,
                features = ?report.drifted_features_list,
                "Data drift DETECTED"
            );
            1
        }
        Ok(_) => {
            info!("No significant data drift detected");
            0
        }
        Err(e) if e.is_not_found() => {
            error!(error = %e, "Failed to load data");
            1
        }
        Err(e) => {
            error!(error = %e, "Drift detection failed");
            1
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = telemetry::init_tracing(&LoggingConfig::default(), env!("CARGO_CRATE_NAME")) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    let outcome =
        drift::detect_drift_files(&args.reference, &args.current, &args.report_path, args.alpha);
    ExitCode::from(exit_status(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_ml_pipeline::PipelineError;

    #[test]
    fn test_no_drift_exits_zero() {
        let report = DriftReport::new(drift::DEFAULT_ALPHA);
        assert_eq!(exit_status(&Ok(report)), 0);
    }

    #[test]
    fn test_drift_exits_one() {
        let mut report = DriftReport::new(drift::DEFAULT_ALPHA);
        report.drift_detected = true;
        report.drifted_features_count = 1;
        report.drifted_features_list = vec!["Amount".to_string()];

        assert_eq!(exit_status(&Ok(report)), 1);
    }

    #[test]
    fn test_load_failure_exits_one() {
        let missing = Err(PipelineError::not_found("reference data", "missing.csv"));
        assert_eq!(exit_status(&missing), 1);

        let disjoint = Err(PipelineError::NoCommonFeatures);
        assert_eq!(exit_status(&disjoint), 1);
    }
}

//! End-to-end training pipeline: preprocess, train, evaluate.

use anyhow::Result;
use clap::Parser;
use fraud_ml_pipeline::{config::PipelineConfig, pipeline, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "train-pipeline", about = "Run the fraud detection training pipeline")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let loaded = PipelineConfig::load_from_path(&args.config);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    telemetry::init_tracing(&logging, env!("CARGO_CRATE_NAME"))?;

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "Failed to load configuration");
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(path = %args.config.display(), "Configuration loaded");

    match pipeline::run_with_config(&config) {
        Ok(model_path) => {
            info!(model = %model_path.display(), "Pipeline finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

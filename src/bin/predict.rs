//! Batch predictions for a CSV of new transactions.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_ml_pipeline::{config::LoggingConfig, models::run_batch_predictions, telemetry};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "predict", about = "Run batch predictions with a trained model")]
struct Args {
    /// Trained model, e.g. runs/train1/model.json
    #[arg(long)]
    model_path: PathBuf,

    /// CSV with the model's feature columns
    #[arg(long)]
    input_data: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(&LoggingConfig::default(), env!("CARGO_CRATE_NAME"))?;

    let output = run_batch_predictions(&args.model_path, &args.input_data)
        .context("batch prediction failed")?;

    info!(output = %output.display(), "Predictions saved");
    Ok(())
}

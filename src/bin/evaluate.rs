//! Evaluate a specific trained model against the configured test split.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_ml_pipeline::{config::PipelineConfig, evaluate, telemetry};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "evaluate", about = "Run the evaluation stage for a trained model")]
struct Args {
    /// Trained model, e.g. runs/train1/model.json
    #[arg(short = 'm', long)]
    model_path: PathBuf,

    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = PipelineConfig::load_from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    telemetry::init_tracing(&config.logging, env!("CARGO_CRATE_NAME"))?;
    info!(path = %args.config.display(), "Configuration loaded");

    let metrics = evaluate::run(&config, &args.model_path)
        .with_context(|| format!("evaluation of {} failed", args.model_path.display()))?;

    info!(
        accuracy = metrics.classification_report.accuracy,
        roc_auc = ?metrics.roc_auc_score,
        "Evaluation complete"
    );
    Ok(())
}

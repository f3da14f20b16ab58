//! End-to-end training pipeline: preprocess, train, evaluate.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::{evaluate, preprocess, train};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span};

/// Load the YAML config at `config_path` and run every stage.
///
/// A config that is missing or fails to parse is logged and returned before
/// any stage runs. Returns the trained model path.
pub fn run_pipeline(config_path: impl AsRef<Path>) -> Result<PathBuf> {
    let config_path = config_path.as_ref();
    let config = match PipelineConfig::load_from_path(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path.display(), error = %e, "Failed to load configuration");
            return Err(e);
        }
    };
    info!(path = %config_path.display(), "Configuration loaded");

    run_with_config(&config)
}

/// Run every stage with an already loaded configuration.
pub fn run_with_config(config: &PipelineConfig) -> Result<PathBuf> {
    let _span = info_span!("pipeline").entered();
    info!("Starting fraud detection training pipeline");

    preprocess::run(config)?;
    let model_path = train::run(config)?;
    let metrics = evaluate::run(config, &model_path)?;

    info!(
        model = %model_path.display(),
        accuracy = metrics.classification_report.accuracy,
        roc_auc = ?metrics.roc_auc_score,
        "Pipeline complete"
    );
    Ok(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_returns_not_found() {
        let dir = TempDir::new().unwrap();
        let err = run_pipeline(dir.path().join("config.yaml")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "data: [unclosed").unwrap();

        let err = run_pipeline(&path).unwrap_err();
        assert!(!err.is_not_found());
    }
}

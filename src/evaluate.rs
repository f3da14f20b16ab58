//! Evaluation stage: score a trained model on the held-out split.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::{print_summary, roc_auc_score, ClassificationReport, ConfusionMatrix};
use crate::models::loader::load_model;
use crate::models::Classifier;
use crate::types::dataset::Dataset;
use crate::types::prediction::FRAUD_CLASS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

pub const METRICS_FILE: &str = "metrics.yaml";

/// Contents of `metrics.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub classification_report: ClassificationReport,
    /// `None` when the test target holds a single class
    pub roc_auc_score: Option<f64>,
    pub confusion_matrix: ConfusionMatrix,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationMetrics {
    /// Compute every metric from labels, predictions and fraud probabilities.
    pub fn compute(y_true: &[i64], y_pred: &[i64], fraud_proba: &[f64]) -> Self {
        Self {
            classification_report: ClassificationReport::new(y_true, y_pred),
            roc_auc_score: roc_auc_score(y_true, fraud_proba, FRAUD_CLASS),
            confusion_matrix: ConfusionMatrix::new(y_true, y_pred),
            evaluated_at: Utc::now(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Evaluate `model_path` against the configured test split and write
/// `metrics.yaml` next to the model.
pub fn run(config: &PipelineConfig, model_path: impl AsRef<Path>) -> Result<EvaluationMetrics> {
    let model_path = model_path.as_ref();
    let _span = info_span!("evaluate", model = %model_path.display()).entered();
    info!("Starting model evaluation");

    let model = load_model(model_path)?;

    let x_test = Dataset::from_csv(&config.data.test_features_path)?;
    let y_test = Dataset::from_csv(&config.data.test_target_path)?.labels()?;
    info!(
        rows = x_test.n_rows(),
        columns = x_test.n_columns(),
        "Test data loaded"
    );

    let x = x_test.feature_matrix(model.feature_names())?;
    let y_pred = model.predict(&x)?;
    let fraud_proba = model.class_probability(&x, FRAUD_CLASS)?;

    let metrics = EvaluationMetrics::compute(&y_test, &y_pred, &fraud_proba);

    metrics.classification_report.log_table();
    if let Some(auc) = metrics.roc_auc_score {
        info!(roc_auc = format!("{:.4}", auc), "ROC AUC score");
    }
    print_summary(
        &metrics.classification_report,
        &metrics.confusion_matrix,
        metrics.roc_auc_score,
    );

    let metrics_path = run_dir_of(model_path).join(METRICS_FILE);
    metrics.save(&metrics_path)?;
    info!(path = %metrics_path.display(), "Evaluation metrics saved");

    Ok(metrics)
}

fn run_dir_of(model_path: &Path) -> PathBuf {
    model_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

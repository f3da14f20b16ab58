//! Classification models, persistence, and batch inference

pub mod aggregator;
pub mod forest;
pub mod inference;
pub mod loader;

pub use aggregator::VoteAggregator;
pub use forest::{RandomForestClassifier, RandomForestParams};
pub use inference::run_batch_predictions;
pub use loader::{load_model, save_model, ModelArtifact};

use crate::error::{PipelineError, Result};

/// A fitted classifier over named numeric features.
pub trait Classifier {
    /// Feature columns in the order the model expects them
    fn feature_names(&self) -> &[String];

    /// Class labels, sorted ascending; probability columns follow this order
    fn classes(&self) -> &[i64];

    /// Per-row class probabilities.
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    /// Most probable class label for each row.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i64>> {
        self.labels_from_proba(&self.predict_proba(x)?)
    }

    /// Map already computed probability rows to their most probable label.
    fn labels_from_proba(&self, probabilities: &[Vec<f64>]) -> Result<Vec<i64>> {
        let classes = self.classes();
        probabilities
            .iter()
            .map(|proba| {
                VoteAggregator::argmax(proba)
                    .and_then(|i| classes.get(i).copied())
                    .ok_or_else(|| {
                        PipelineError::InvalidData("empty probability vector".into())
                    })
            })
            .collect()
    }

    /// Probability of `label` for each row, zero when the model never saw it.
    fn class_probability(&self, x: &[Vec<f64>], label: i64) -> Result<Vec<f64>> {
        let column = self.classes().iter().position(|&c| c == label);
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|proba| column.and_then(|i| proba.get(i).copied()).unwrap_or(0.0))
            .collect())
    }
}

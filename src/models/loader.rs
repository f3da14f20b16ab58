//! Model artifact persistence

use crate::error::{PipelineError, Result};
use crate::models::forest::RandomForestClassifier;
use crate::models::Classifier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Serialized model, tagged by the `model_type` named in the training config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type")]
pub enum ModelArtifact {
    RandomForest(RandomForestClassifier),
}

impl ModelArtifact {
    pub fn model_type(&self) -> &'static str {
        match self {
            ModelArtifact::RandomForest(_) => "RandomForest",
        }
    }
}

impl Classifier for ModelArtifact {
    fn feature_names(&self) -> &[String] {
        match self {
            ModelArtifact::RandomForest(m) => m.feature_names(),
        }
    }

    fn classes(&self) -> &[i64] {
        match self {
            ModelArtifact::RandomForest(m) => m.classes(),
        }
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match self {
            ModelArtifact::RandomForest(m) => m.predict_proba(x),
        }
    }
}

/// Load a model artifact from a JSON file
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelArtifact> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PipelineError::not_found("model", path));
    }

    let bytes = fs::read(path).map_err(|e| PipelineError::load(path, e))?;
    let model: ModelArtifact =
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::load(path, e))?;

    info!(
        path = %path.display(),
        model_type = model.model_type(),
        features = model.feature_names().len(),
        "Model loaded successfully"
    );
    Ok(model)
}

/// Write a model artifact, creating parent directories as needed
pub fn save_model<P: AsRef<Path>>(model: &ModelArtifact, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(model)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "Model saved");
    Ok(())
}

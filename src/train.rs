//! Training stage: fit the configured classifier and persist a `train<N>` run.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::models::forest::{RandomForestClassifier, RandomForestParams};
use crate::models::loader::{save_model, ModelArtifact};
use crate::paths::next_version_dir;
use crate::types::dataset::Dataset;
use std::fs;
use std::path::PathBuf;
use tracing::{info, info_span};

pub const MODEL_FILE: &str = "model.json";
pub const ARGS_FILE: &str = "args.yaml";

/// Train on the configured split and return the saved model path.
pub fn run(config: &PipelineConfig) -> Result<PathBuf> {
    let _span = info_span!("train").entered();
    info!("Starting model training");

    let features_path = &config.data.train_features_path;
    let target_path = &config.data.train_target_path;
    info!(
        features = %features_path.display(),
        target = %target_path.display(),
        "Loading training data"
    );

    let x_train = Dataset::from_csv(features_path)?;
    let y_train = Dataset::from_csv(target_path)?.labels()?;
    info!(
        rows = x_train.n_rows(),
        columns = x_train.n_columns(),
        "Training data loaded"
    );

    let model = fit_model(config, &x_train, &y_train)?;

    let run_dir = next_version_dir(&config.runs.base_dir, "train")?;
    info!(dir = %run_dir.display(), "Run directory created");

    let model_path = run_dir.join(MODEL_FILE);
    save_model(&model, &model_path)?;

    let args_path = run_dir.join(ARGS_FILE);
    fs::write(&args_path, serde_yaml::to_string(&config.training)?)?;
    info!(path = %args_path.display(), "Hyper-parameters saved");

    info!(model = %model_path.display(), "Model training complete");
    Ok(model_path)
}

/// Build and fit the model named by `training.model_type`.
pub fn fit_model(config: &PipelineConfig, x: &Dataset, y: &[i64]) -> Result<ModelArtifact> {
    match config.training.model_type.as_str() {
        "RandomForest" => {
            let params = RandomForestParams::from_value(&config.training.params)?;
            info!(?params, "Training RandomForest");

            let feature_names: Vec<String> =
                x.column_names().into_iter().map(String::from).collect();
            let matrix = x.feature_matrix(&feature_names)?;
            let model = RandomForestClassifier::fit(params, feature_names, &matrix, y)?;

            info!(trees = model.n_trees(), "Model trained successfully");
            Ok(ModelArtifact::RandomForest(model))
        }
        other => Err(PipelineError::UnsupportedModelType(other.to_string())),
    }
}

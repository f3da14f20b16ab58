//! Configuration management for the fraud detection pipeline

use crate::error::{PipelineError, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Feature selection strategy applied during preprocessing
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Keep every column
    #[default]
    All,
    /// Keep `Time`, `Amount` and the N columns most correlated with `Class`
    TopCorrelated,
}

/// Main pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub preprocessing: PreprocessingConfig,
    pub features: FeaturesConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub runs: RunsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dataset locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Raw labelled CSV consumed by preprocessing
    pub raw_data_path: PathBuf,
    /// Directory preprocessing writes its splits into
    pub processed_data_dir: PathBuf,
    pub train_features_path: PathBuf,
    pub train_target_path: PathBuf,
    pub test_features_path: PathBuf,
    pub test_target_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreprocessingConfig {
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_data_ratio: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub feature_selection: FeatureSelection,
    pub top_n_features: usize,
}

/// Model training section; serialized verbatim into `args.yaml`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingConfig {
    /// Only `RandomForest` is supported
    pub model_type: String,
    /// Forwarded as-is to the classifier constructor
    #[serde(default = "default_params")]
    pub params: serde_json::Value,
}

fn default_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Run artifact layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunsConfig {
    /// Directory holding `train<N>` run directories
    #[serde(default = "default_runs_dir")]
    pub base_dir: PathBuf,
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("runs")
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_runs_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PipelineError::not_found("config file", path));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                raw_data_path: PathBuf::from("data/raw/creditcard.csv"),
                processed_data_dir: PathBuf::from("data/processed"),
                train_features_path: PathBuf::from("data/processed/train_processed.csv"),
                train_target_path: PathBuf::from("data/processed/train_processed_target.csv"),
                test_features_path: PathBuf::from("data/processed/test_processed.csv"),
                test_target_path: PathBuf::from("data/processed/test_processed_target.csv"),
            },
            preprocessing: PreprocessingConfig {
                test_data_ratio: 0.2,
            },
            features: FeaturesConfig {
                feature_selection: FeatureSelection::All,
                top_n_features: 5,
            },
            training: TrainingConfig {
                model_type: "RandomForest".to_string(),
                params: default_params(),
            },
            runs: RunsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

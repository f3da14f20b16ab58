//! Preprocessing stage: raw labelled CSV to stratified train/test splits.

use crate::config::{FeatureSelection, PipelineConfig};
use crate::drift::LABEL_COLUMN;
use crate::error::{PipelineError, Result};
use crate::features::select_features;
use crate::types::dataset::{column_labels, Column, Dataset};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, info_span, warn};

/// Seed of the train/test shuffle
pub const SPLIT_SEED: u64 = 42;

/// Identifier column dropped from the feature set when present
pub const ID_COLUMN: &str = "id";

pub const TRAIN_FEATURES_FILE: &str = "train_processed.csv";
pub const TEST_FEATURES_FILE: &str = "test_processed.csv";
pub const TRAIN_TARGET_FILE: &str = "train_processed_target.csv";
pub const TEST_TARGET_FILE: &str = "test_processed_target.csv";

/// Paths written by [`run`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSplits {
    pub train_features: PathBuf,
    pub test_features: PathBuf,
    pub train_target: PathBuf,
    pub test_target: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Load, clean, split and persist the raw dataset.
pub fn run(config: &PipelineConfig) -> Result<ProcessedSplits> {
    let _span = info_span!("preprocess").entered();
    info!("Starting data preprocessing");

    let ratio = config.preprocessing.test_data_ratio;
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(PipelineError::InvalidArgument(format!(
            "test_data_ratio must be in (0, 1), got {}",
            ratio
        )));
    }

    let output_dir = &config.data.processed_data_dir;
    if !output_dir.is_dir() {
        fs::create_dir_all(output_dir)?;
        info!(dir = %output_dir.display(), "Created processed data directory");
    }

    let mut df = Dataset::from_csv(&config.data.raw_data_path)?;
    info!(
        path = %config.data.raw_data_path.display(),
        rows = df.n_rows(),
        columns = df.n_columns(),
        "Raw data loaded"
    );

    let missing: usize = df.columns().iter().map(Column::missing_count).sum();
    if missing > 0 {
        warn!(missing, "Missing values found, filling with column means");
        df.fill_missing_with_mean();
    }

    if config.features.feature_selection != FeatureSelection::All {
        df = select_features(
            df,
            config.features.feature_selection,
            config.features.top_n_features,
        );
    }

    let target = df.drop_column(LABEL_COLUMN).ok_or_else(|| {
        PipelineError::InvalidData(format!("column '{}' not found", LABEL_COLUMN))
    })?;
    df.drop_column(ID_COLUMN);

    let labels = column_labels(&target)?;
    let (train_idx, test_idx) = stratified_split(&labels, ratio, SPLIT_SEED);
    let target = Dataset::new(vec![target])?;

    let splits = ProcessedSplits {
        train_features: output_dir.join(TRAIN_FEATURES_FILE),
        test_features: output_dir.join(TEST_FEATURES_FILE),
        train_target: output_dir.join(TRAIN_TARGET_FILE),
        test_target: output_dir.join(TEST_TARGET_FILE),
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    };

    df.take_rows(&train_idx).to_csv(&splits.train_features)?;
    df.take_rows(&test_idx).to_csv(&splits.test_features)?;
    target.take_rows(&train_idx).to_csv(&splits.train_target)?;
    target.take_rows(&test_idx).to_csv(&splits.test_target)?;

    info!(
        train_rows = splits.train_rows,
        test_rows = splits.test_rows,
        features = df.n_columns(),
        dir = %output_dir.display(),
        "Preprocessing complete"
    );
    Ok(splits)
}

/// Row indices for the train and test sides of a stratified split.
///
/// Each class sends `round(count * test_ratio)` randomly chosen rows to the
/// test side. Both sides keep ascending row order.
pub fn stratified_split(labels: &[i64], test_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut is_test = vec![false; labels.len()];
    for rows in by_class.values_mut() {
        let n_test = (rows.len() as f64 * test_ratio).round() as usize;
        rows.shuffle(&mut rng);
        for &i in rows.iter().take(n_test) {
            is_test[i] = true;
        }
    }

    (0..labels.len()).partition(|&i| !is_test[i])
}

//! Feature engineering and selection for the credit-card fraud dataset.
//!
//! The raw dataset has anonymised `V1..V28` components plus `Time`
//! (seconds since the first transaction), `Amount` and the `Class` label.

use crate::config::FeatureSelection;
use crate::drift::LABEL_COLUMN;
use crate::error::{PipelineError, Result};
use crate::types::dataset::{Column, ColumnData, Dataset};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Columns always kept by `top_correlated` selection when present.
pub const ALWAYS_KEPT: [&str; 2] = ["Time", "Amount"];

/// Reduce `dataset` to the columns chosen by `strategy`.
///
/// `TopCorrelated` keeps `Time`, `Amount`, the `top_n` numeric columns with
/// the largest absolute Pearson correlation to `Class`, and `Class` itself.
/// Without a `Class` column the dataset is returned unchanged.
pub fn select_features(dataset: Dataset, strategy: FeatureSelection, top_n: usize) -> Dataset {
    info!(
        strategy = ?strategy,
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        "Selecting features"
    );

    match strategy {
        FeatureSelection::All => dataset,
        FeatureSelection::TopCorrelated => {
            let Some(label) = dataset.column(LABEL_COLUMN) else {
                warn!("'{}' column not found, keeping all features", LABEL_COLUMN);
                return dataset;
            };
            let label = label.row_values();

            let top = top_correlated(&dataset, &label, top_n);
            info!(top_n, features = ?top, "Top correlated features");

            let mut keep: Vec<&str> = Vec::new();
            for name in ALWAYS_KEPT {
                if dataset.has_column(name) {
                    keep.push(name);
                } else {
                    warn!(column = name, "Column not found in dataset");
                }
            }
            for name in &top {
                if !keep.contains(&name.as_str()) {
                    keep.push(name);
                }
            }
            keep.push(LABEL_COLUMN);

            let selected = dataset.select(&keep);
            info!(columns = ?selected.column_names(), "Features selected");
            selected
        }
    }
}

/// Names of the `top_n` numeric columns most correlated (in absolute value)
/// with `label`, strongest first. Ties keep column order; columns with an
/// undefined correlation are never selected.
fn top_correlated(dataset: &Dataset, label: &[f64], top_n: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &str, f64)> = dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name() != LABEL_COLUMN)
        .filter_map(|(i, c)| match c.data() {
            ColumnData::Numeric(values) => pearson(values, label).map(|r| (i, c.name(), r.abs())),
            ColumnData::Categorical(_) => None,
        })
        .collect();

    for (_, name, r) in &scored {
        debug!(feature = name, abs_correlation = r, "Correlation with label");
    }

    scored.sort_by(|a, b| match b.2.total_cmp(&a.2) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    scored
        .into_iter()
        .take(top_n)
        .map(|(_, name, _)| name.to_string())
        .collect()
}

/// Pearson correlation over the rows where both values are present.
///
/// Returns `None` with fewer than two complete pairs or a constant input.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom > 0.0 {
        Some((cov / denom).clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Append `Time_hour`, the hour of day derived from `Time` in seconds.
pub fn create_time_features(dataset: &Dataset) -> Result<Dataset> {
    let time = dataset
        .column("Time")
        .ok_or_else(|| PipelineError::InvalidData("column 'Time' does not exist".into()))?;

    let hours = time
        .row_values()
        .into_iter()
        .map(|seconds| (seconds / 3600.0).rem_euclid(24.0))
        .collect();

    let mut columns = dataset.columns().to_vec();
    columns.push(Column::numeric("Time_hour", hours));
    Dataset::new(columns)
}

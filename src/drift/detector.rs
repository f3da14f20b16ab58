//! Column-by-column drift detection between a reference and a current dataset.

use crate::drift::stats::{chi2_contingency, ks_2samp};
use crate::error::{PipelineError, Result};
use crate::types::dataset::{Column, ColumnKind, Dataset};
use crate::types::report::{DriftReport, DriftTest, FeatureDrift};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, info_span, warn};

/// Significance level used when the caller does not pick one
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Target column; never tested for drift
pub const LABEL_COLUMN: &str = "Class";

/// Runs KS tests on numeric features and chi-squared tests on categorical ones.
#[derive(Debug, Clone, Copy)]
pub struct DriftDetector {
    alpha: f64,
}

impl DriftDetector {
    /// `alpha` must lie strictly between 0 and 1.
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(PipelineError::InvalidArgument(format!(
                "alpha must be in (0, 1), got {}",
                alpha
            )));
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Compare every column present in both datasets.
    ///
    /// Column types come from the reference dataset. Numeric columns are
    /// tested first, then categorical ones, each in reference column order.
    /// Features whose test preconditions do not hold are skipped with a
    /// warning.
    pub fn detect(&self, reference: &Dataset, current: &Dataset) -> Result<DriftReport> {
        let _span = info_span!("drift_check", alpha = self.alpha).entered();

        let (numeric, categorical) = partition_common_columns(reference, current);
        if numeric.is_empty() && categorical.is_empty() {
            return Err(PipelineError::NoCommonFeatures);
        }
        info!(
            features = numeric.len() + categorical.len(),
            numeric = numeric.len(),
            categorical = categorical.len(),
            "Analysing common features"
        );

        let mut report = DriftReport::new(self.alpha);

        for (ref_col, cur_col) in numeric {
            if let Some(result) = self.test_numeric(ref_col, cur_col)? {
                report.record(ref_col.name(), result);
            }
        }
        for (ref_col, cur_col) in categorical {
            if let Some(result) = self.test_categorical(ref_col, cur_col)? {
                report.record(ref_col.name(), result);
            }
        }

        info!(
            tested = report.tested_features(),
            drifted = report.drifted_features_count,
            drifted_features = ?report.drifted_features_list,
            "Drift analysis complete"
        );

        Ok(report)
    }

    fn test_numeric(&self, reference: &Column, current: &Column) -> Result<Option<FeatureDrift>> {
        let ref_values = reference.numeric_values();
        let cur_values = current.numeric_values();

        if ref_values.len() < 2 || cur_values.len() < 2 {
            warn!(
                feature = reference.name(),
                reference_samples = ref_values.len(),
                current_samples = cur_values.len(),
                "Feature skipped: not enough samples for the KS test"
            );
            return Ok(None);
        }

        let outcome = ks_2samp(&ref_values, &cur_values)?;
        Ok(Some(FeatureDrift {
            kind: ColumnKind::Numerical,
            test: DriftTest::KolmogorovSmirnov,
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            drifted: outcome.p_value < self.alpha,
        }))
    }

    fn test_categorical(
        &self,
        reference: &Column,
        current: &Column,
    ) -> Result<Option<FeatureDrift>> {
        let ref_counts = reference.value_counts();
        let cur_counts = current.value_counts();

        let categories: BTreeSet<&String> = ref_counts.keys().chain(cur_counts.keys()).collect();
        let table: Vec<[f64; 2]> = categories
            .iter()
            .map(|c| {
                [
                    ref_counts.get(*c).copied().unwrap_or(0) as f64,
                    cur_counts.get(*c).copied().unwrap_or(0) as f64,
                ]
            })
            .collect();
        let total: f64 = table.iter().map(|row| row[0] + row[1]).sum();

        if table.len() < 2 || total < 2.0 {
            warn!(
                feature = reference.name(),
                categories = table.len(),
                "Feature skipped: not enough data or categories for the chi-squared test"
            );
            return Ok(None);
        }
        if table.iter().flatten().any(|&cell| cell == 0.0) {
            warn!(
                feature = reference.name(),
                "Feature skipped: contingency table has zero cells"
            );
            return Ok(None);
        }

        let outcome = chi2_contingency(&table, true)?;
        Ok(Some(FeatureDrift {
            kind: ColumnKind::Categorical,
            test: DriftTest::ChiSquared,
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            drifted: outcome.p_value < self.alpha,
        }))
    }
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

type ColumnPair<'a> = (&'a Column, &'a Column);

/// Common columns (label excluded) split by the reference column's type.
fn partition_common_columns<'a>(
    reference: &'a Dataset,
    current: &'a Dataset,
) -> (Vec<ColumnPair<'a>>, Vec<ColumnPair<'a>>) {
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();

    for ref_col in reference.columns() {
        if ref_col.name() == LABEL_COLUMN {
            continue;
        }
        let Some(cur_col) = current.column(ref_col.name()) else {
            continue;
        };
        match ref_col.kind() {
            ColumnKind::Numerical => numeric.push((ref_col, cur_col)),
            ColumnKind::Categorical => categorical.push((ref_col, cur_col)),
        }
    }

    (numeric, categorical)
}

/// Run a drift check on in-memory datasets.
pub fn detect_drift(reference: &Dataset, current: &Dataset, alpha: f64) -> Result<DriftReport> {
    DriftDetector::new(alpha)?.detect(reference, current)
}

/// Load both CSVs, run the drift check and write the JSON report.
pub fn detect_drift_files(
    reference_path: impl AsRef<Path>,
    current_path: impl AsRef<Path>,
    report_path: impl AsRef<Path>,
    alpha: f64,
) -> Result<DriftReport> {
    let (reference_path, current_path, report_path) = (
        reference_path.as_ref(),
        current_path.as_ref(),
        report_path.as_ref(),
    );
    let detector = DriftDetector::new(alpha)?;

    info!(
        reference = %reference_path.display(),
        current = %current_path.display(),
        alpha,
        "Starting data drift detection"
    );

    let reference = Dataset::from_csv(reference_path)?;
    let current = Dataset::from_csv(current_path)?;
    info!(
        reference_rows = reference.n_rows(),
        current_rows = current.n_rows(),
        "Datasets loaded"
    );

    let report = detector.detect(&reference, &current)?;
    report.save(report_path)?;
    info!(path = %report_path.display(), "Drift report saved");

    Ok(report)
}

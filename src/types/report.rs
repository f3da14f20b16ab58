//! Drift report data structures

use crate::error::{PipelineError, Result};
use crate::types::dataset::ColumnKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Statistical test applied to a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftTest {
    /// Two-sample Kolmogorov-Smirnov, numeric features
    #[serde(rename = "KS")]
    KolmogorovSmirnov,
    /// Chi-squared contingency test, categorical features
    #[serde(rename = "Chi-squared")]
    ChiSquared,
}

/// Outcome of testing one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub test: DriftTest,
    pub statistic: f64,
    pub p_value: f64,
    pub drifted: bool,
}

/// Aggregate result of a drift check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub drift_detected: bool,
    /// Significance threshold used for every test
    pub alpha: f64,
    pub drifted_features_count: usize,
    /// Drifted features in the order they were tested
    pub drifted_features_list: Vec<String>,
    pub feature_details: BTreeMap<String, FeatureDrift>,
}

impl DriftReport {
    pub fn new(alpha: f64) -> Self {
        Self {
            drift_detected: false,
            alpha,
            drifted_features_count: 0,
            drifted_features_list: Vec::new(),
            feature_details: BTreeMap::new(),
        }
    }

    /// Add a tested feature and keep the aggregate fields consistent.
    pub fn record(&mut self, feature: &str, result: FeatureDrift) {
        if result.drifted {
            self.drifted_features_list.push(feature.to_string());
            self.drifted_features_count = self.drifted_features_list.len();
            self.drift_detected = true;
        }
        self.feature_details.insert(feature.to_string(), result);
    }

    pub fn tested_features(&self) -> usize {
        self.feature_details.len()
    }

    /// Write as indented JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PipelineError::not_found("drift report", path));
        }
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::load(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ks(p_value: f64, drifted: bool) -> FeatureDrift {
        FeatureDrift {
            kind: ColumnKind::Numerical,
            test: DriftTest::KolmogorovSmirnov,
            statistic: 0.4,
            p_value,
            drifted,
        }
    }

    #[test]
    fn test_record_updates_aggregates() {
        let mut report = DriftReport::new(0.05);
        report.record("feature_2", ks(0.5, false));
        report.record("feature_1", ks(0.001, true));

        assert!(report.drift_detected);
        assert_eq!(report.drifted_features_count, 1);
        assert_eq!(report.drifted_features_list, vec!["feature_1"]);
        assert_eq!(report.tested_features(), 2);
    }

    #[test]
    fn test_json_schema() {
        let mut report = DriftReport::new(0.05);
        report.record("merchant", FeatureDrift {
            kind: ColumnKind::Categorical,
            test: DriftTest::ChiSquared,
            statistic: 12.0,
            p_value: 0.01,
            drifted: true,
        });

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        let details = &json["feature_details"]["merchant"];
        assert_eq!(details["type"], "categorical");
        assert_eq!(details["test"], "Chi-squared");
        assert_eq!(json["drifted_features_list"][0], "merchant");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/reports/drift_report.json");
        let mut report = DriftReport::new(0.01);
        report.record("feature_1", ks(0.0001, true));
        report.record("feature_2", ks(0.7, false));

        report.save(&path).unwrap();
        let loaded = DriftReport::load(&path).unwrap();

        assert_eq!(loaded.drift_detected, report.drift_detected);
        assert_eq!(loaded.drifted_features_count, report.drifted_features_count);
        assert_eq!(loaded.feature_details.len(), report.feature_details.len());
    }
}

//! Batch prediction over a CSV of transactions

use crate::error::{PipelineError, Result};
use crate::models::loader::load_model;
use crate::models::Classifier;
use crate::paths::next_version_dir;
use crate::types::dataset::Dataset;
use crate::types::prediction::{PredictionRecord, PredictionStatus};
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

/// Output file written inside each `predict<N>` directory
pub const PREDICTIONS_FILE: &str = "predictions.csv";

/// Score every row of `input_data_path` and write `predictions.csv` into a
/// new `predict<N>` directory next to the model. Returns the CSV path.
pub fn run_batch_predictions<P, Q>(model_path: P, input_data_path: Q) -> Result<PathBuf>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let model_path = model_path.as_ref();
    let input_data_path = input_data_path.as_ref();
    let _span = info_span!("batch_predict", model = %model_path.display()).entered();

    let model = load_model(model_path)?;

    if !input_data_path.is_file() {
        return Err(PipelineError::not_found("input data", input_data_path));
    }
    let input = Dataset::from_csv(input_data_path)?;
    info!(
        path = %input_data_path.display(),
        rows = input.n_rows(),
        "Input data loaded"
    );

    let x = input.feature_matrix(model.feature_names())?;
    let records = predict_records(&model, &x)?;

    let run_root = model_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let output_dir = next_version_dir(run_root, "predict")?;
    let output_path = output_dir.join(PREDICTIONS_FILE);

    let mut writer = csv::Writer::from_path(&output_path)?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    let fraud_count = records
        .iter()
        .filter(|r| r.status_predicao == PredictionStatus::Fraud)
        .count();
    info!(
        output = %output_path.display(),
        predictions = records.len(),
        fraud = fraud_count,
        "Batch predictions written"
    );

    Ok(output_path)
}

/// Labels and confidences for each row of `x`.
pub fn predict_records<M: Classifier>(model: &M, x: &[Vec<f64>]) -> Result<Vec<PredictionRecord>> {
    let probabilities = model.predict_proba(x)?;
    let labels = model.labels_from_proba(&probabilities)?;

    Ok(labels
        .into_iter()
        .zip(probabilities.iter())
        .map(|(label, proba)| PredictionRecord::new(label, proba))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forest::{RandomForestClassifier, RandomForestParams};
    use crate::models::loader::{save_model, ModelArtifact};
    use std::fs;
    use tempfile::TempDir;

    fn write_model(dir: &Path) -> PathBuf {
        let x = vec![vec![0.0, 1.0], vec![0.2, 1.1], vec![9.0, 1.0], vec![9.5, 0.9]];
        let y = vec![0, 0, 1, 1];
        let params = RandomForestParams {
            n_estimators: 5,
            max_features: None,
            bootstrap: false,
            random_state: Some(1),
            ..Default::default()
        };
        let model = RandomForestClassifier::fit(
            params,
            vec!["V1".to_string(), "Amount".to_string()],
            &x,
            &y,
        )
        .unwrap();

        let path = dir.join("train1").join("model.json");
        save_model(&ModelArtifact::RandomForest(model), &path).unwrap();
        path
    }

    #[test]
    fn test_predictions_written_under_model_run() {
        let dir = TempDir::new().unwrap();
        let model_path = write_model(dir.path());
        let input = dir.path().join("new.csv");
        fs::write(&input, "V1,Amount,extra\n9.1,1.0,x\n0.1,1.0,y\n").unwrap();

        let output = run_batch_predictions(&model_path, &input).unwrap();
        assert_eq!(
            output,
            dir.path().join("train1").join("predict1").join(PREDICTIONS_FILE)
        );

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let records: Vec<PredictionRecord> =
            reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status_predicao, PredictionStatus::Fraud);
        assert_eq!(records[0].predicao_raw, 1);
        assert_eq!(records[1].status_predicao, PredictionStatus::Normal);
        assert!(records.iter().all(|r| r.probabilidade >= 0.5));

        let second = run_batch_predictions(&model_path, &input).unwrap();
        assert!(second.starts_with(dir.path().join("train1").join("predict2")));
    }

    /// Fixed-probability classifier that counts forward passes.
    struct CountingClassifier {
        features: Vec<String>,
        classes: Vec<i64>,
        passes: std::cell::Cell<usize>,
    }

    impl Classifier for CountingClassifier {
        fn feature_names(&self) -> &[String] {
            &self.features
        }

        fn classes(&self) -> &[i64] {
            &self.classes
        }

        fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
            self.passes.set(self.passes.get() + 1);
            Ok(x.iter()
                .map(|row| if row[0] > 0.5 { vec![0.2, 0.8] } else { vec![0.7, 0.3] })
                .collect())
        }
    }

    #[test]
    fn test_predict_records_runs_model_once() {
        let model = CountingClassifier {
            features: vec!["V1".to_string()],
            classes: vec![0, 1],
            passes: std::cell::Cell::new(0),
        };

        let records = predict_records(&model, &[vec![0.9], vec![0.1]]).unwrap();

        assert_eq!(model.passes.get(), 1);
        assert_eq!(records[0].predicao_raw, 1);
        assert_eq!(records[0].probabilidade, 0.8);
        assert_eq!(records[1].status_predicao, PredictionStatus::Normal);
        assert_eq!(records[1].probabilidade, 0.7);
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let dir = TempDir::new().unwrap();
        let model_path = write_model(dir.path());

        let err = run_batch_predictions(&model_path, dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { what: "input data", .. }));
        assert!(!dir.path().join("train1").join("predict1").exists());
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("new.csv");
        fs::write(&input, "V1,Amount\n1.0,2.0\n").unwrap();

        let err = run_batch_predictions(dir.path().join("model.json"), &input).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { what: "model", .. }));
    }

    #[test]
    fn test_input_missing_feature_column() {
        let dir = TempDir::new().unwrap();
        let model_path = write_model(dir.path());
        let input = dir.path().join("new.csv");
        fs::write(&input, "V1\n1.0\n").unwrap();

        let err = run_batch_predictions(&model_path, &input).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidData(_)));
    }
}

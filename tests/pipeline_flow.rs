//! Full flow: preprocess, train, evaluate, then score new data and serve it.

use axum::Json;
use fraud_ml_pipeline::api::handlers::{
    batch_predict, check_drift, BatchPredictRequest, DriftCheckRequest,
};
use fraud_ml_pipeline::evaluate::METRICS_FILE;
use fraud_ml_pipeline::models::{load_model, Classifier};
use fraud_ml_pipeline::train::ARGS_FILE;
use fraud_ml_pipeline::types::{PredictionRecord, PredictionStatus};
use fraud_ml_pipeline::{run_batch_predictions, run_pipeline};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Labelled rows where `V1 > 4` marks fraud.
fn write_raw_data(path: &Path) {
    let mut raw = String::from("id,Time,V1,V2,Amount,Class\n");
    for i in 0..200 {
        let fraud = i % 10 == 0;
        let v1 = if fraud { 6.0 + (i % 7) as f64 * 0.1 } else { (i % 9) as f64 * 0.2 };
        let v2 = ((i * 37) % 11) as f64 - 5.0;
        let amount = 10.0 + (i % 13) as f64;
        raw.push_str(&format!(
            "{},{},{},{},{},{}\n",
            i,
            i * 60,
            v1,
            v2,
            amount,
            u8::from(fraud)
        ));
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, raw).unwrap();
}

fn write_config(root: &Path, feature_selection: &str) -> std::path::PathBuf {
    let processed = root.join("data/processed");
    let yaml = format!(
        r#"
data:
  raw_data_path: {raw}
  processed_data_dir: {processed}
  train_features_path: {processed}/train_processed.csv
  train_target_path: {processed}/train_processed_target.csv
  test_features_path: {processed}/test_processed.csv
  test_target_path: {processed}/test_processed_target.csv
preprocessing:
  test_data_ratio: 0.2
features:
  feature_selection: {feature_selection}
  top_n_features: 1
training:
  model_type: RandomForest
  params:
    n_estimators: 10
    max_depth: 6
    max_features: null
    random_state: 42
runs:
  base_dir: {runs}
"#,
        raw = root.join("data/raw/creditcard.csv").display(),
        processed = processed.display(),
        runs = root.join("runs").display(),
    );
    let path = root.join("config.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_pipeline_produces_run_artifacts() {
    let dir = TempDir::new().unwrap();
    write_raw_data(&dir.path().join("data/raw/creditcard.csv"));
    let config_path = write_config(dir.path(), "all");

    let model_path = run_pipeline(&config_path).unwrap();
    let run_dir = dir.path().join("runs/train1");
    assert_eq!(model_path, run_dir.join("model.json"));
    assert!(run_dir.join(ARGS_FILE).is_file());
    assert!(run_dir.join(METRICS_FILE).is_file());

    let model = load_model(&model_path).unwrap();
    assert_eq!(model.feature_names(), &["Time", "V1", "V2", "Amount"]);

    let metrics: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(run_dir.join(METRICS_FILE)).unwrap()).unwrap();
    assert_eq!(metrics["classification_report"]["accuracy"].as_f64(), Some(1.0));

    let second = run_pipeline(&config_path).unwrap();
    assert_eq!(second, dir.path().join("runs/train2/model.json"));
}

#[test]
fn test_top_correlated_selection_narrows_features() {
    let dir = TempDir::new().unwrap();
    write_raw_data(&dir.path().join("data/raw/creditcard.csv"));
    let config_path = write_config(dir.path(), "top_correlated");

    let model_path = run_pipeline(&config_path).unwrap();
    let model = load_model(&model_path).unwrap();

    assert_eq!(model.feature_names(), &["Time", "Amount", "V1"]);
}

#[test]
fn test_batch_predictions_after_training() {
    let dir = TempDir::new().unwrap();
    write_raw_data(&dir.path().join("data/raw/creditcard.csv"));
    let model_path = run_pipeline(write_config(dir.path(), "all")).unwrap();

    let input = dir.path().join("new_transactions.csv");
    fs::write(
        &input,
        "Time,V1,V2,Amount\n100,6.2,0,15\n200,0.4,1,12\n300,0.2,-2,20\n",
    )
    .unwrap();

    let output = run_batch_predictions(&model_path, &input).unwrap();
    assert_eq!(output, dir.path().join("runs/train1/predict1/predictions.csv"));

    let mut reader = csv::Reader::from_path(&output).unwrap();
    assert_eq!(
        reader.headers().unwrap(),
        vec!["status_predicao", "predicao_raw", "probabilidade"]
    );
    let records: Vec<PredictionRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    let statuses: Vec<PredictionStatus> = records.iter().map(|r| r.status_predicao).collect();
    assert_eq!(
        statuses,
        vec![
            PredictionStatus::Fraud,
            PredictionStatus::Normal,
            PredictionStatus::Normal
        ]
    );
    assert!(records
        .iter()
        .all(|r| (0.5..=1.0).contains(&r.probabilidade)));
}

#[tokio::test]
async fn test_api_handlers_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_raw_data(&dir.path().join("data/raw/creditcard.csv"));
    let model_path = run_pipeline(write_config(dir.path(), "all")).unwrap();
    let processed = dir.path().join("data/processed");

    let Json(predicted) = batch_predict(Json(BatchPredictRequest {
        model_path,
        input_data_path: processed.join("test_processed.csv"),
    }))
    .await
    .unwrap();
    assert!(predicted.output_file.ends_with("predict1/predictions.csv"));

    let report_path = dir.path().join("runs/drift_report.json");
    let Json(drift) = check_drift(Json(DriftCheckRequest {
        reference_path: processed.join("train_processed.csv"),
        current_path: processed.join("train_processed.csv"),
        report_path: report_path.clone(),
        alpha: 0.01,
    }))
    .await
    .unwrap();
    assert!(!drift.results.drift_detected);
    assert_eq!(drift.results.feature_details.len(), 4);
    assert!(report_path.is_file());
}

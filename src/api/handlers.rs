//! HTTP request handlers
//!
//! Each handler moves its blocking pipeline work onto the blocking pool and
//! maps `PipelineError` into a `{ "detail": ... }` body.

use crate::api::AppState;
use crate::drift::{detect_drift_files, DEFAULT_ALPHA};
use crate::error::PipelineError;
use crate::models::inference::run_batch_predictions;
use crate::types::report::DriftReport;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, info_span, Instrument};

/// Generate a request ID
fn request_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4().simple())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Handler failure: `NotFound` maps to 404, everything else to 500.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::Pipeline(e) if e.is_not_found() => format!("File not found: {}", e),
            ApiError::Pipeline(e) => format!("Internal server error: {}", e),
            ApiError::Task(msg) => format!("Internal server error: {}", msg),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody { detail: self.detail() })).into_response()
    }
}

/// Run blocking pipeline work off the async executor.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(task))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?
        .map_err(ApiError::from)
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Welcome message
pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the credit card fraud detection API!".to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    };

    (StatusCode::OK, Json(health))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPredictRequest {
    pub model_path: PathBuf,
    pub input_data_path: PathBuf,
}

impl Default for BatchPredictRequest {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("runs/train1/model.json"),
            input_data_path: PathBuf::from("data/raw/new_transactions.csv"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    pub message: String,
    pub output_file: PathBuf,
}

/// Run batch predictions for a model and input CSV
pub async fn batch_predict(
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<BatchPredictResponse>, ApiError> {
    let span = info_span!("batch_predict_request", request_id = %request_id());
    async move {
        info!(?request, "Batch prediction request received");

        let BatchPredictRequest {
            model_path,
            input_data_path,
        } = request;
        let output_file = run_blocking(move || run_batch_predictions(model_path, input_data_path))
            .await
            .map_err(|e| {
                error!(error = %e.detail(), "Batch prediction failed");
                e
            })?;

        Ok(Json(BatchPredictResponse {
            message: "Batch predictions completed successfully.".to_string(),
            output_file,
        }))
    }
    .instrument(span)
    .await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftCheckRequest {
    pub reference_path: PathBuf,
    pub current_path: PathBuf,
    pub report_path: PathBuf,
    pub alpha: f64,
}

impl Default for DriftCheckRequest {
    fn default() -> Self {
        Self {
            reference_path: PathBuf::from("data/processed/train_features.csv"),
            current_path: PathBuf::from("data/raw/production_features_batch.csv"),
            report_path: PathBuf::from("runs/drift_report.json"),
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriftCheckResponse {
    pub message: String,
    pub results: DriftReport,
}

/// Compare a current dataset against a reference and persist the report
pub async fn check_drift(
    Json(request): Json<DriftCheckRequest>,
) -> Result<Json<DriftCheckResponse>, ApiError> {
    let span = info_span!("check_drift_request", request_id = %request_id());
    async move {
        info!(?request, "Drift check request received");

        let DriftCheckRequest {
            reference_path,
            current_path,
            report_path,
            alpha,
        } = request;
        let results = run_blocking(move || {
            detect_drift_files(reference_path, current_path, report_path, alpha)
        })
        .await
        .map_err(|e| {
            error!(error = %e.detail(), "Drift check failed");
            e
        })?;

        Ok(Json(DriftCheckResponse {
            message: "Drift detection completed.".to_string(),
            results,
        }))
    }
    .instrument(span)
    .await
}

//! HTTP API for batch prediction and drift checks

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    started_at: Arc<Instant>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            started_at: Arc::new(Instant::now()),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the router with tracing and permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/batch-predict", post(handlers::batch_predict))
        .route("/check-drift", post(handlers::check_drift))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

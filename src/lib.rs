//! Fraud ML Pipeline Library
//!
//! Credit-card fraud detection: preprocessing, random-forest training and
//! evaluation, batch prediction into versioned run directories, and
//! statistical data-drift detection, with an HTTP API on top.

pub mod api;
pub mod config;
pub mod drift;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod metrics;
pub mod models;
pub mod paths;
pub mod pipeline;
pub mod preprocess;
pub mod telemetry;
pub mod train;
pub mod types;

pub use config::PipelineConfig;
pub use drift::{detect_drift, detect_drift_files, DriftDetector};
pub use error::{PipelineError, Result};
pub use models::{load_model, run_batch_predictions, Classifier, ModelArtifact};
pub use paths::next_version_dir;
pub use pipeline::run_pipeline;
pub use types::{Dataset, DriftReport};

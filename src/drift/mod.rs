//! Statistical drift detection between a reference and a current dataset

pub mod detector;
pub mod stats;

pub use detector::{detect_drift, detect_drift_files, DriftDetector, DEFAULT_ALPHA, LABEL_COLUMN};

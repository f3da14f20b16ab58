//! Type definitions for the fraud detection pipeline

pub mod dataset;
pub mod prediction;
pub mod report;

pub use dataset::{Column, ColumnData, ColumnKind, Dataset};
pub use prediction::{PredictionRecord, PredictionStatus};
pub use report::{DriftReport, DriftTest, FeatureDrift};

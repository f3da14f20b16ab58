//! Batch prediction output structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of the fraud class in trained models
pub const FRAUD_CLASS: i64 = 1;

/// Human-readable prediction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    #[serde(rename = "FRAUDE")]
    Fraud,
    #[serde(rename = "Normal")]
    Normal,
}

impl PredictionStatus {
    /// Only the exact fraud label maps to `Fraud`.
    pub fn from_label(label: i64) -> Self {
        if label == FRAUD_CLASS {
            PredictionStatus::Fraud
        } else {
            PredictionStatus::Normal
        }
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionStatus::Fraud => write!(f, "FRAUDE"),
            PredictionStatus::Normal => write!(f, "Normal"),
        }
    }
}

/// One row of `predictions.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub status_predicao: PredictionStatus,
    /// Raw class label returned by the model
    pub predicao_raw: i64,
    /// Probability of the predicted class
    pub probabilidade: f64,
}

impl PredictionRecord {
    /// Build a record from a predicted label and the row's class probabilities.
    pub fn new(label: i64, probabilities: &[f64]) -> Self {
        let confidence = probabilities.iter().copied().fold(0.0, f64::max);
        Self {
            status_predicao: PredictionStatus::from_label(label),
            predicao_raw: label,
            probabilidade: confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_label() {
        assert_eq!(PredictionStatus::from_label(1), PredictionStatus::Fraud);
        assert_eq!(PredictionStatus::from_label(0), PredictionStatus::Normal);
        assert_eq!(PredictionStatus::from_label(2), PredictionStatus::Normal);
        assert_eq!(PredictionStatus::from_label(-1), PredictionStatus::Normal);
    }

    #[test]
    fn test_record_confidence_is_max_probability() {
        let record = PredictionRecord::new(0, &[0.83, 0.17]);

        assert_eq!(record.status_predicao, PredictionStatus::Normal);
        assert_eq!(record.probabilidade, 0.83);
    }

    #[test]
    fn test_csv_serialization() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(PredictionRecord::new(1, &[0.1, 0.9])).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(out, "status_predicao,predicao_raw,probabilidade\nFRAUDE,1,0.9\n");
    }
}

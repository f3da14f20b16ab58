//! Classification metrics for model evaluation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Precision, recall and F1 for one class (or an average of classes)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: u64,
}

/// Per-class metrics keyed by label, plus accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    #[serde(flatten)]
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build the report over every label seen in `y_true` or `y_pred`.
    ///
    /// Undefined ratios (no predicted or no true samples) count as zero.
    pub fn new(y_true: &[i64], y_pred: &[i64]) -> Self {
        let cm = ConfusionMatrix::new(y_true, y_pred);
        let total: u64 = cm.support().iter().sum();

        let mut classes = BTreeMap::new();
        let mut per_class = Vec::with_capacity(cm.labels.len());
        for (i, label) in cm.labels.iter().enumerate() {
            let tp = cm.matrix[i][i] as f64;
            let predicted: u64 = cm.matrix.iter().map(|row| row[i]).sum();
            let support: u64 = cm.matrix[i].iter().sum();

            let precision = ratio(tp, predicted as f64);
            let recall = ratio(tp, support as f64);
            let f1_score = ratio(2.0 * precision * recall, precision + recall);

            let metrics = ClassMetrics {
                precision,
                recall,
                f1_score,
                support,
            };
            per_class.push(metrics);
            classes.insert(label.to_string(), metrics);
        }

        let n = per_class.len() as f64;
        let macro_avg = ClassMetrics {
            precision: ratio(per_class.iter().map(|m| m.precision).sum(), n),
            recall: ratio(per_class.iter().map(|m| m.recall).sum(), n),
            f1_score: ratio(per_class.iter().map(|m| m.f1_score).sum(), n),
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            ratio(
                per_class.iter().map(|m| f(m) * m.support as f64).sum(),
                total as f64,
            )
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1_score: weighted(|m| m.f1_score),
            support: total,
        };

        let correct: u64 = (0..cm.labels.len()).map(|i| cm.matrix[i][i]).sum();

        Self {
            classes,
            accuracy: ratio(correct as f64, total as f64),
            macro_avg,
            weighted_avg,
        }
    }

    /// Log the report as a table.
    pub fn log_table(&self) {
        info!("{:>14} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support");
        for (label, m) in &self.classes {
            log_row(label, m);
        }
        info!(
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support
        );
        log_row("macro avg", &self.macro_avg);
        log_row("weighted avg", &self.weighted_avg);
    }
}

fn log_row(label: &str, m: &ClassMetrics) {
    info!(
        "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
        label, m.precision, m.recall, m.f1_score, m.support
    );
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Counts of (true label, predicted label) pairs. Rows are true labels,
/// columns predicted labels, both in ascending label order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<i64>,
    pub matrix: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[i64], y_pred: &[i64]) -> Self {
        let labels: Vec<i64> = y_true
            .iter()
            .chain(y_pred)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut matrix = vec![vec![0u64; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred) {
            if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
                matrix[i][j] += 1;
            }
        }

        Self { labels, matrix }
    }

    /// Number of true samples per label
    pub fn support(&self) -> Vec<u64> {
        self.matrix.iter().map(|row| row.iter().sum()).collect()
    }

    /// Row-normalised matrix (each true label's predictions sum to one).
    pub fn normalized(&self) -> Vec<Vec<f64>> {
        self.matrix
            .iter()
            .map(|row| {
                let total: u64 = row.iter().sum();
                row.iter().map(|&c| ratio(c as f64, total as f64)).collect()
            })
            .collect()
    }
}

/// Area under the ROC curve for `positive` against every other label.
///
/// Computed from the Mann-Whitney rank statistic with average ranks for
/// tied scores. Returns `None` when `y_true` holds a single class.
pub fn roc_auc_score(y_true: &[i64], scores: &[f64], positive: i64) -> Option<f64> {
    let n = y_true.len().min(scores.len());
    let y_true = &y_true[..n];
    let n_pos = y_true.iter().filter(|&&y| y == positive).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        warn!("Only one class present in y_true, ROC AUC is undefined");
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            if y_true[i] == positive {
                pos_rank_sum += avg_rank;
            }
        }
        start = end;
    }

    let (n_pos, n_neg) = (n_pos as f64, n_neg as f64);
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Log an evaluation summary box.
pub fn print_summary(report: &ClassificationReport, cm: &ConfusionMatrix, roc_auc: Option<f64>) {
    let total = report.macro_avg.support;
    let roc = roc_auc
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "n/a".to_string());

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║              FRAUD MODEL - EVALUATION SUMMARY                ║");
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!(
        "║ Test Samples: {:>8}  │  Accuracy: {:>6.2}%  │  ROC AUC: {:>6} ║",
        total,
        report.accuracy * 100.0,
        roc
    );
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║ Confusion Matrix (rows = true, cols = predicted):            ║");
    info!(
        "║   {:>10} {}",
        "",
        cm.labels
            .iter()
            .map(|l| format!("{:>10}", l))
            .collect::<String>()
    );
    let normalized = cm.normalized();
    for (i, (label, row)) in cm.labels.iter().zip(&cm.matrix).enumerate() {
        info!(
            "║   {:>10} {}   ({:.1}% correct)",
            label,
            row.iter().map(|c| format!("{:>10}", c)).collect::<String>(),
            normalized[i][i] * 100.0
        );
    }
    info!("╚══════════════════════════════════════════════════════════════╝");
}

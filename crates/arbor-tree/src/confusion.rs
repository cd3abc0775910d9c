//! Confusion matrix and per-class classification metrics.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::TreeError;
use crate::value::Label;

/// A confusion matrix over the sorted union of true and predicted labels.
///
/// Entry `matrix[i][j]` counts samples whose true label is `labels[i]` and
/// whose prediction is `labels[j]`.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    labels: Vec<Label>,
    matrix: Vec<Vec<usize>>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class label.
    pub label: Label,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | Zero labels provided |
    /// | [`TreeError::MetricLengthMismatch`] | Inputs differ in length |
    pub fn from_labels(true_labels: &[Label], predicted: &[Label]) -> Result<Self, TreeError> {
        if true_labels.len() != predicted.len() {
            return Err(TreeError::MetricLengthMismatch {
                n_true: true_labels.len(),
                n_pred: predicted.len(),
            });
        }
        if true_labels.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        let labels: Vec<Label> = true_labels
            .iter()
            .chain(predicted)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let n_classes = labels.len();
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (t, p) in true_labels.iter().zip(predicted) {
            // Both come from `labels`, so the searches succeed.
            let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) else {
                continue;
            };
            matrix[i][j] += 1;
        }
        Ok(Self { labels, matrix })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        let total: usize = self.matrix.iter().flat_map(|row| row.iter()).sum();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support, in label order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.n_classes();
        self.labels
            .iter()
            .enumerate()
            .map(|(c, label)| {
                let tp = self.matrix[c][c];
                let predicted: usize = (0..n).map(|i| self.matrix[i][c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = if predicted == 0 {
                    0.0
                } else {
                    tp as f64 / predicted as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the row/column labels.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|l| l.to_string().len())
            .chain(self.matrix.iter().flatten().map(|v| v.to_string().len()))
            .max()
            .unwrap_or(1)
            .max(4);

        write!(f, "{:>width$}", "true")?;
        for label in &self.labels {
            write!(f, " {:>width$}", label.to_string())?;
        }
        writeln!(f)?;

        for (label, row) in self.labels.iter().zip(&self.matrix) {
            write!(f, "{:>width$}", label.to_string())?;
            for val in row {
                write!(f, " {val:>width$}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

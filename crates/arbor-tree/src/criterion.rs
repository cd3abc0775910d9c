//! Impurity criteria for classification and regression.

use std::fmt;

/// Criterion for measuring the impurity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Shannon entropy in bits: -Σ(p_i · log2(p_i))
    Entropy,
    /// Mean squared deviation from the mean.
    Mse,
    /// Mean absolute deviation from the mean.
    Mae,
}

impl Criterion {
    /// Return `true` for the label-based criteria (Gini, Entropy).
    #[must_use]
    pub fn is_classification(self) -> bool {
        matches!(self, Criterion::Gini | Criterion::Entropy)
    }

    /// Impurity of a node from its class counts.
    ///
    /// Returns 0.0 when `n_samples` is zero. Regression criteria fall back
    /// to Gini here; callers resolve the criterion per task before fitting.
    #[must_use]
    pub fn class_impurity(self, class_counts: &[usize], n_samples: usize) -> f64 {
        if n_samples == 0 {
            return 0.0;
        }
        let n = n_samples as f64;
        match self {
            Criterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.log2()
                })
                .sum::<f64>(),
            _ => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                (1.0 - sum_sq).max(0.0)
            }
        }
    }

    /// Impurity of a set of regression targets.
    ///
    /// Returns 0.0 for an empty slice. Classification criteria fall back
    /// to MSE here.
    #[must_use]
    pub fn value_impurity(self, values: &[f64]) -> f64 {
        // Identical values are pure even when the mean is inexact.
        if values.windows(2).all(|w| w[0] == w[1]) {
            return 0.0;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        match self {
            Criterion::Mae => values.iter().map(|v| (v - mean).abs()).sum::<f64>() / n,
            _ => values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
            Criterion::Mse => "mse",
            Criterion::Mae => "mae",
        };
        write!(f, "{name}")
    }
}

/// Gini impurity of an arbitrary label sequence.
#[must_use]
pub fn gini<T: PartialEq>(labels: &[T]) -> f64 {
    let counts = label_counts(labels);
    Criterion::Gini.class_impurity(&counts, labels.len())
}

/// Entropy (bits) of an arbitrary label sequence.
#[must_use]
pub fn entropy<T: PartialEq>(labels: &[T]) -> f64 {
    let counts = label_counts(labels);
    Criterion::Entropy.class_impurity(&counts, labels.len())
}

/// Mean squared deviation of `values` from their mean.
#[must_use]
pub fn mse(values: &[f64]) -> f64 {
    Criterion::Mse.value_impurity(values)
}

/// Mean absolute deviation of `values` from their mean.
#[must_use]
pub fn mae(values: &[f64]) -> f64 {
    Criterion::Mae.value_impurity(values)
}

// Counts per distinct label in first-seen order; only equality is needed.
fn label_counts<T: PartialEq>(labels: &[T]) -> Vec<usize> {
    let mut seen: Vec<&T> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for label in labels {
        match seen.iter().position(|s| *s == label) {
            Some(i) => counts[i] += 1,
            None => {
                seen.push(label);
                counts.push(1);
            }
        }
    }
    counts
}

//! Scalar metrics over true and predicted vectors.

pub use crate::confusion::{ClassMetrics, ConfusionMatrix};
use crate::error::TreeError;
use crate::value::Label;

fn check_lengths(n_true: usize, n_pred: usize) -> Result<(), TreeError> {
    if n_true != n_pred {
        return Err(TreeError::MetricLengthMismatch { n_true, n_pred });
    }
    if n_true == 0 {
        return Err(TreeError::EmptyDataset);
    }
    Ok(())
}

/// Fraction of predictions equal to the true label.
///
/// # Errors
///
/// [`TreeError::MetricLengthMismatch`] or [`TreeError::EmptyDataset`].
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64, TreeError> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Mean of squared residuals.
///
/// # Errors
///
/// [`TreeError::MetricLengthMismatch`] or [`TreeError::EmptyDataset`].
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, TreeError> {
    check_lengths(y_true.len(), y_pred.len())?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Mean of absolute residuals.
///
/// # Errors
///
/// [`TreeError::MetricLengthMismatch`] or [`TreeError::EmptyDataset`].
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, TreeError> {
    check_lengths(y_true.len(), y_pred.len())?;
    let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(sum / y_true.len() as f64)
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant `y_true` gives 1.0 for a perfect fit and 0.0 otherwise.
///
/// # Errors
///
/// [`TreeError::MetricLengthMismatch`] or [`TreeError::EmptyDataset`].
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64, TreeError> {
    check_lengths(y_true.len(), y_pred.len())?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

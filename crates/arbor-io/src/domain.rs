//! The tabular dataset produced by [`DatasetReader`](crate::DatasetReader).

use arbor_tree::{FeatureValue, Label};

use crate::IoError;

/// Feature rows plus an optional raw target column.
///
/// Rows are stored in file order: `features[i]` and `targets[i]` come from
/// the same CSV record. Targets stay as the raw cell text until the caller
/// decides whether the task is classification or regression.
#[derive(Debug, Clone)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Vec<Vec<FeatureValue>>,
    target_name: Option<String>,
    targets: Vec<String>,
}

impl Dataset {
    pub(crate) fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<FeatureValue>>,
        target_name: Option<String>,
        targets: Vec<String>,
    ) -> Self {
        Self {
            feature_names,
            features,
            target_name,
            targets,
        }
    }

    /// Return the feature column names from the CSV header.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<FeatureValue>] {
        &self.features
    }

    /// Return the target column name, if one was split off.
    #[must_use]
    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    /// Return the raw target cells. Empty when read without a target.
    #[must_use]
    pub fn raw_targets(&self) -> &[String] {
        &self.targets
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Targets as class labels: numeric cells become numeric labels.
    #[must_use]
    pub fn labels(&self) -> Vec<Label> {
        self.targets.iter().map(|raw| Label::parse(raw)).collect()
    }

    /// Targets as regression values.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NonNumericTarget`] for the first cell that is not
    /// a finite number.
    pub fn regression_targets(&self) -> Result<Vec<f64>, IoError> {
        self.targets
            .iter()
            .enumerate()
            .map(|(row_index, raw)| match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(IoError::NonNumericTarget {
                    row_index,
                    raw: raw.clone(),
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(targets: &[&str]) -> Dataset {
        let features = targets
            .iter()
            .enumerate()
            .map(|(i, _)| vec![FeatureValue::Numeric(i as f64), FeatureValue::from("x")])
            .collect();
        Dataset::new(
            vec!["a".into(), "b".into()],
            features,
            Some("y".into()),
            targets.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn labels_keep_numbers_and_text_apart() {
        let ds = dataset(&["1", "setosa", "2.0"]);
        assert_eq!(
            ds.labels(),
            vec![Label::from(1.0), Label::from("setosa"), Label::from(2.0)]
        );
    }

    #[test]
    fn regression_targets_parse() {
        let ds = dataset(&["1.5", " 2 ", "-3e2"]);
        assert_eq!(ds.regression_targets().unwrap(), vec![1.5, 2.0, -300.0]);
    }

    #[test]
    fn regression_targets_reject_text() {
        let ds = dataset(&["1.5", "high"]);
        assert!(matches!(
            ds.regression_targets(),
            Err(IoError::NonNumericTarget { row_index: 1, .. })
        ));
    }

    #[test]
    fn regression_targets_reject_infinity() {
        let ds = dataset(&["inf"]);
        assert!(matches!(
            ds.regression_targets(),
            Err(IoError::NonNumericTarget { row_index: 0, .. })
        ));
    }

    #[test]
    fn shape_accessors() {
        let ds = dataset(&["0", "1"]);
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.target_name(), Some("y"));
    }
}

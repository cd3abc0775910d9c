//! Single decision tree for regression.

use tracing::{info, instrument};

use crate::config::TreeConfig;
use crate::error::TreeError;
use crate::matrix::prepare;
use crate::node::Node;
use crate::outcome::Regression;
use crate::tree::{Tree, grow};
use crate::value::{FeatureType, FeatureValue};

/// A CART regressor whose leaves predict the mean target.
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    pub(crate) config: TreeConfig,
    pub(crate) tree: Option<Tree<f64>>,
}

/// Reject NaN and infinite targets.
pub(crate) fn check_targets(y: &[f64]) -> Result<(), TreeError> {
    match y.iter().position(|v| !v.is_finite()) {
        Some(sample_index) => Err(TreeError::NonFiniteTarget { sample_index }),
        None => Ok(()),
    }
}

impl DecisionTreeRegressor {
    /// Create an unfitted regressor.
    #[must_use]
    pub fn new(config: TreeConfig) -> Self {
        Self { config, tree: None }
    }

    /// Return the hyperparameters.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Train on `x` (row-major) and `y`, replacing any previous fit.
    ///
    /// # Errors
    ///
    /// The same validation errors as
    /// [`DecisionTreeClassifier::fit`](crate::DecisionTreeClassifier::fit),
    /// plus [`TreeError::NonFiniteTarget`] for NaN or infinite targets.
    #[instrument(skip_all, fields(n_samples = x.len()))]
    pub fn fit(&mut self, x: &[Vec<FeatureValue>], y: &[f64]) -> Result<(), TreeError> {
        self.tree = None;
        self.config.validate()?;
        let prepared = prepare(x, y.len(), self.config.feature_types())?;
        check_targets(y)?;
        let criterion = self.config.regression_criterion();
        let outcome = Regression::new(y, criterion);
        let tree = grow(&prepared, &outcome, criterion, &self.config)?;

        info!(
            n_features = prepared.n_features,
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            "decision tree regressor fitted"
        );
        self.tree = Some(tree);
        Ok(())
    }

    pub(crate) fn fitted(&self) -> Result<&Tree<f64>, TreeError> {
        self.tree.as_ref().ok_or(TreeError::NotFitted)
    }

    /// Predict the target of one sample.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`; routing errors from malformed trees.
    pub fn predict_one(&self, sample: &[FeatureValue]) -> Result<f64, TreeError> {
        self.fitted()?.leaf_value(sample).copied()
    }

    /// Predict targets for every row of `x`.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict(&self, x: &[Vec<FeatureValue>]) -> Result<Vec<f64>, TreeError> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Normalized gain-based importances, one per feature column.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFitted`] before `fit`.
    pub fn feature_importances(&self) -> Result<Vec<f64>, TreeError> {
        Ok(self.fitted()?.importances.clone())
    }

    /// Feature column count seen during `fit`.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.tree.as_ref().map(|t| t.n_features)
    }

    /// Column types used during `fit`, declared or inferred.
    #[must_use]
    pub fn feature_types(&self) -> Option<&[FeatureType]> {
        self.tree.as_ref().map(|t| t.feature_types.as_slice())
    }

    /// The fitted node arena, root first.
    #[must_use]
    pub fn nodes(&self) -> Option<&[Node<f64>]> {
        self.tree.as_ref().map(|t| t.nodes.as_slice())
    }

    /// Number of nodes; 0 before `fit`.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.tree.as_ref().map_or(0, Tree::n_nodes)
    }

    /// Number of leaves; 0 before `fit`.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.tree.as_ref().map_or(0, Tree::n_leaves)
    }

    /// Depth of the deepest leaf; 0 before `fit`.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tree.as_ref().map_or(0, Tree::depth)
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new(TreeConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::Criterion;
    use crate::value::numeric_matrix;

    fn line() -> (Vec<Vec<FeatureValue>>, Vec<f64>) {
        (
            numeric_matrix(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]]),
            vec![10.0, 20.0, 30.0, 40.0, 50.0],
        )
    }

    #[test]
    fn predictions_stay_in_range_and_monotone() {
        let (x, y) = line();
        let mut reg = DecisionTreeRegressor::default();
        reg.fit(&x, &y).unwrap();
        let mid = reg.predict_one(&[FeatureValue::Numeric(2.5)]).unwrap();
        assert!(mid > 10.0 && mid < 40.0, "got {mid}");
        let low = reg.predict_one(&[FeatureValue::Numeric(1.0)]).unwrap();
        let high = reg.predict_one(&[FeatureValue::Numeric(5.0)]).unwrap();
        assert!(low < high);
    }

    #[test]
    fn stump_predicts_side_means() {
        let (x, _) = line();
        let y = [10.0, 20.0, 30.0, 40.0, 100.0];
        let mut reg = DecisionTreeRegressor::new(TreeConfig::new().with_max_depth(Some(1)));
        reg.fit(&x, &y).unwrap();
        assert_eq!(reg.n_leaves(), 2);
        assert!((reg.predict_one(&[FeatureValue::Numeric(1.0)]).unwrap() - 25.0).abs() < 1e-9);
        assert!((reg.predict_one(&[FeatureValue::Numeric(5.0)]).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_target_rejected() {
        let (x, mut y) = line();
        y[3] = f64::NAN;
        let mut reg = DecisionTreeRegressor::default();
        let err = reg.fit(&x, &y).unwrap_err();
        assert!(matches!(err, TreeError::NonFiniteTarget { sample_index: 3 }));
    }

    #[test]
    fn classification_criterion_is_coerced() {
        let (x, y) = line();
        let mut reg =
            DecisionTreeRegressor::new(TreeConfig::new().with_criterion(Criterion::Entropy));
        reg.fit(&x, &y).unwrap();
        assert_eq!(reg.fitted().unwrap().criterion, Criterion::Mse);
    }

    #[test]
    fn mae_criterion_fits() {
        let (x, y) = line();
        let mut reg = DecisionTreeRegressor::new(TreeConfig::new().with_criterion(Criterion::Mae));
        reg.fit(&x, &y).unwrap();
        assert!(reg.n_leaves() >= 2);
        let low = reg.predict_one(&[FeatureValue::Numeric(1.0)]).unwrap();
        let high = reg.predict_one(&[FeatureValue::Numeric(5.0)]).unwrap();
        assert!(low < high);
    }

    #[test]
    fn not_fitted() {
        let reg = DecisionTreeRegressor::default();
        assert!(matches!(reg.predict_one(&[]), Err(TreeError::NotFitted)));
        assert_eq!(reg.n_nodes(), 0);
    }
}

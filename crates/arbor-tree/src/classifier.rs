//! Single decision tree for classification.

use std::collections::BTreeSet;

use tracing::{info, instrument};

use crate::config::TreeConfig;
use crate::error::TreeError;
use crate::matrix::prepare;
use crate::node::Node;
use crate::outcome::Classification;
use crate::tree::{Tree, grow};
use crate::value::{FeatureType, FeatureValue, Label};

/// A CART classifier over numeric and categorical features.
///
/// Leaves hold class distributions aligned with [`classes`](Self::classes),
/// the sorted list of labels seen during `fit`.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    pub(crate) config: TreeConfig,
    pub(crate) fitted: Option<FittedClassifier>,
}

#[derive(Debug, Clone)]
pub(crate) struct FittedClassifier {
    pub(crate) tree: Tree<Vec<f64>>,
    pub(crate) classes: Vec<Label>,
}

/// Sorted unique labels and each target's position in that list.
pub(crate) fn encode_labels(y: &[Label]) -> (Vec<Label>, Vec<usize>) {
    let classes: Vec<Label> = y.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let encoded = y
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or_default())
        .collect();
    (classes, encoded)
}

/// Index of the first maximum; 0 for an empty slice.
pub(crate) fn argmax(probs: &[f64]) -> usize {
    let mut best = 0;
    for (i, p) in probs.iter().enumerate() {
        if *p > probs[best] {
            best = i;
        }
    }
    best
}

impl DecisionTreeClassifier {
    /// Create an unfitted classifier.
    #[must_use]
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
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
    /// | Variant | When |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | `x` is empty |
    /// | [`TreeError::TargetLengthMismatch`] | `x.len() != y.len()` |
    /// | [`TreeError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`TreeError::FeatureTypeCountMismatch`] | declared types do not cover every column |
    /// | [`TreeError::InvalidMaxFeatures`] | `max_features` resolves outside `[1, n_features]` |
    /// | Other config variants | a hyperparameter is out of range |
    #[instrument(skip_all, fields(n_samples = x.len()))]
    pub fn fit(&mut self, x: &[Vec<FeatureValue>], y: &[Label]) -> Result<(), TreeError> {
        self.fitted = None;
        self.config.validate()?;
        let prepared = prepare(x, y.len(), self.config.feature_types())?;
        let (classes, encoded) = encode_labels(y);
        let criterion = self.config.classification_criterion();
        let outcome = Classification::new(&encoded, classes.len(), criterion);
        let tree = grow(&prepared, &outcome, criterion, &self.config)?;

        info!(
            n_features = prepared.n_features,
            n_classes = classes.len(),
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            "decision tree classifier fitted"
        );
        self.fitted = Some(FittedClassifier { tree, classes });
        Ok(())
    }

    pub(crate) fn fitted(&self) -> Result<&FittedClassifier, TreeError> {
        self.fitted.as_ref().ok_or(TreeError::NotFitted)
    }

    /// Predict the label of one sample.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`; routing errors from malformed trees.
    pub fn predict_one(&self, sample: &[FeatureValue]) -> Result<Label, TreeError> {
        let fitted = self.fitted()?;
        let probs = fitted.tree.leaf_value(sample)?;
        fitted
            .classes
            .get(argmax(probs))
            .cloned()
            .ok_or_else(|| TreeError::malformed("leaf distribution longer than class list"))
    }

    /// Predict labels for every row of `x`.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict(&self, x: &[Vec<FeatureValue>]) -> Result<Vec<Label>, TreeError> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Class probabilities for one sample, ordered like [`classes`](Self::classes).
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict_proba_one(&self, sample: &[FeatureValue]) -> Result<Vec<f64>, TreeError> {
        Ok(self.fitted()?.tree.leaf_value(sample)?.clone())
    }

    /// Class probabilities for every row of `x`.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict_proba(&self, x: &[Vec<FeatureValue>]) -> Result<Vec<Vec<f64>>, TreeError> {
        x.iter().map(|row| self.predict_proba_one(row)).collect()
    }

    /// Normalized gain-based importances, one per feature column.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFitted`] before `fit`.
    pub fn feature_importances(&self) -> Result<Vec<f64>, TreeError> {
        Ok(self.fitted()?.tree.importances.clone())
    }

    /// Sorted labels seen during `fit`; empty before `fit`.
    #[must_use]
    pub fn classes(&self) -> &[Label] {
        self.fitted.as_ref().map_or(&[], |f| f.classes.as_slice())
    }

    /// Feature column count seen during `fit`.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.tree.n_features)
    }

    /// Column types used during `fit`, declared or inferred.
    #[must_use]
    pub fn feature_types(&self) -> Option<&[FeatureType]> {
        self.fitted.as_ref().map(|f| f.tree.feature_types.as_slice())
    }

    /// The fitted node arena, root first.
    #[must_use]
    pub fn nodes(&self) -> Option<&[Node<Vec<f64>>]> {
        self.fitted.as_ref().map(|f| f.tree.nodes.as_slice())
    }

    /// Number of nodes; 0 before `fit`.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.tree.n_nodes())
    }

    /// Number of leaves; 0 before `fit`.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.tree.n_leaves())
    }

    /// Depth of the deepest leaf; 0 before `fit`.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.tree.depth())
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(TreeConfig::new())
    }
}

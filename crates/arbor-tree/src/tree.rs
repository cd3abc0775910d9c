//! Fitted tree arena shared by the classifier and regressor.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::builder::{BuildParams, build};
use crate::config::TreeConfig;
use crate::criterion::Criterion;
use crate::error::TreeError;
use crate::matrix::Prepared;
use crate::node::{Node, NodeIndex};
use crate::outcome::Outcome;
use crate::prune::prune;
use crate::value::{FeatureType, FeatureValue};

/// A fitted decision tree.
///
/// Stored as an arena-based `Vec<Node>` rooted at index 0. `V` is the leaf
/// payload: a class distribution or a regression mean.
#[derive(Debug, Clone)]
pub(crate) struct Tree<V> {
    pub(crate) nodes: Vec<Node<V>>,
    pub(crate) n_features: usize,
    pub(crate) feature_types: Vec<FeatureType>,
    pub(crate) criterion: Criterion,
    /// Normalized to sum to 1, or all zeros when no split was found.
    pub(crate) importances: Vec<f64>,
}

/// Grow, prune and package a tree over prepared columns.
pub(crate) fn grow<O: Outcome>(
    prepared: &Prepared,
    outcome: &O,
    criterion: Criterion,
    config: &TreeConfig,
) -> Result<Tree<O::Leaf>, TreeError> {
    let max_features = if prepared.n_features == 0 {
        0
    } else {
        config.max_features.resolve(prepared.n_features)?
    };
    let params = BuildParams {
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        min_impurity_decrease: config.min_impurity_decrease,
        max_features,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let built = build(
        &prepared.columns,
        outcome,
        prepared.n_samples,
        params,
        &mut rng,
    );
    let mut nodes = built.nodes;
    debug!(n_nodes = nodes.len(), "decision tree built");

    if config.ccp_alpha > 0.0 {
        prune(&mut nodes, config.ccp_alpha);
    }

    Ok(Tree {
        nodes,
        n_features: prepared.n_features,
        feature_types: prepared.feature_types.clone(),
        criterion,
        importances: normalize(built.importances),
    })
}

fn normalize(mut totals: Vec<f64>) -> Vec<f64> {
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}

impl<V> Tree<V> {
    /// Route `sample` from the root to a leaf and return its payload.
    ///
    /// A missing value, or a value a threshold rule cannot read as a number,
    /// goes to the child that saw more training samples (left on a tie).
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`TreeError::FeatureIndexOutOfBounds`] | a split reads past the end of `sample` |
    /// | [`TreeError::MalformedTree`] | a child index is out of range or the walk revisits nodes |
    pub(crate) fn leaf_value(&self, sample: &[FeatureValue]) -> Result<&V, TreeError> {
        let mut idx = 0usize;
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| TreeError::malformed(format!("node {idx} does not exist")))?;
            let (feature, rule, left, right) = match node {
                Node::Leaf { value, .. } => return Ok(value),
                Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                    ..
                } => (*feature, rule, *left, *right),
            };
            let value = sample
                .get(feature.index())
                .ok_or(TreeError::FeatureIndexOutOfBounds {
                    feature_index: feature.index(),
                    n_features: sample.len(),
                })?;
            let go_left = match rule.goes_left(value) {
                Some(direction) => direction,
                None => self.larger_is_left(left, right)?,
            };
            idx = if go_left { left.index() } else { right.index() };
        }
        Err(TreeError::malformed("cycle detected while routing a sample"))
    }

    fn larger_is_left(&self, left: NodeIndex, right: NodeIndex) -> Result<bool, TreeError> {
        let count = |idx: NodeIndex| {
            self.nodes
                .get(idx.index())
                .map(Node::n_samples)
                .ok_or_else(|| TreeError::malformed(format!("node {idx} does not exist")))
        };
        Ok(count(right)? <= count(left)?)
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    pub(crate) fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree (root-only tree has depth 0).
    pub(crate) fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(idx)
                && depth < self.nodes.len()
            {
                stack.push((left.index(), depth + 1));
                stack.push((right.index(), depth + 1));
            }
        }
        max_depth
    }
}

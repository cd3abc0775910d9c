//! Recursive top-down tree construction.

use rand_chacha::ChaCha8Rng;

use crate::matrix::Column;
use crate::node::{Impurity, Node, NodeIndex};
use crate::outcome::Outcome;
use crate::split::{SplitParams, find_best_split};

/// Stopping rules and split constraints for one build.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildParams {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_impurity_decrease: f64,
    pub(crate) max_features: usize,
}

/// Arena and raw importance totals produced by [`build`].
#[derive(Debug)]
pub(crate) struct BuiltTree<V> {
    pub(crate) nodes: Vec<Node<V>>,
    pub(crate) importances: Vec<f64>,
}

struct Builder<'a, O: Outcome> {
    columns: &'a [Column],
    outcome: &'a O,
    params: BuildParams,
    rng: &'a mut ChaCha8Rng,
    arena: Vec<Node<O::Leaf>>,
    importances: Vec<f64>,
    n_root: f64,
}

/// Grow a tree over `n_samples` rows, root at arena index 0.
pub(crate) fn build<O: Outcome>(
    columns: &[Column],
    outcome: &O,
    n_samples: usize,
    params: BuildParams,
    rng: &mut ChaCha8Rng,
) -> BuiltTree<O::Leaf> {
    let mut builder = Builder {
        columns,
        outcome,
        params,
        rng,
        arena: Vec::new(),
        importances: vec![0.0; columns.len()],
        n_root: n_samples as f64,
    };
    let sample_indices: Vec<usize> = (0..n_samples).collect();
    builder.grow(&sample_indices, 0);
    BuiltTree {
        nodes: builder.arena,
        importances: builder.importances,
    }
}

impl<O: Outcome> Builder<'_, O> {
    /// Build the subtree for `sample_indices` and return its arena index.
    fn grow(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let stats = self.outcome.stats_of(sample_indices);
        let value = self.outcome.leaf_value(&stats);
        let impurity = Impurity::new(self.outcome.node_impurity(sample_indices));

        let depth_exceeded = self.params.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.params.min_samples_split;
        let pure = impurity.value() == 0.0;

        if self.columns.is_empty() || depth_exceeded || too_few || pure {
            return self.push_leaf(value, impurity, n_samples);
        }

        let split_params = SplitParams {
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: self.params.max_features,
        };
        let Some(split) = find_best_split(
            self.columns,
            self.outcome,
            sample_indices,
            &split_params,
            &mut *self.rng,
        ) else {
            return self.push_leaf(value, impurity, n_samples);
        };

        // Credited before acceptance checks, so rejected winners still count.
        self.importances[split.feature.index()] +=
            split.gain.max(0.0) * (n_samples as f64 / self.n_root);

        if split.gain <= self.params.min_impurity_decrease
            || split.left_indices.len() < self.params.min_samples_leaf
            || split.right_indices.len() < self.params.min_samples_leaf
        {
            return self.push_leaf(value, impurity, n_samples);
        }

        // Arena pattern: reserve index, recurse, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value: value.clone(),
            impurity,
            n_samples,
        });

        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            rule: split.rule,
            left,
            right,
            impurity,
            n_samples,
            value,
        };
        NodeIndex::new(node_idx)
    }

    fn push_leaf(&mut self, value: O::Leaf, impurity: Impurity, n_samples: usize) -> NodeIndex {
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::criterion::Criterion;
    use crate::outcome::{Classification, Regression};

    fn params(max_depth: Option<usize>) -> BuildParams {
        BuildParams {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_impurity_decrease: 0.0,
            max_features: 1,
        }
    }

    fn column(values: &[f64]) -> Vec<Column> {
        vec![Column::Numeric(values.iter().map(|&v| Some(v)).collect())]
    }

    #[test]
    fn separable_data_builds_one_split() {
        let columns = column(&[1.0, 2.0, 3.0, 10.0, 11.0, 12.0]);
        let labels = [0, 0, 0, 1, 1, 1];
        let outcome = Classification::new(&labels, 2, Criterion::Gini);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let built = build(&columns, &outcome, 6, params(None), &mut rng);

        assert_eq!(built.nodes.len(), 3);
        assert!(!built.nodes[0].is_leaf());
        assert_eq!(built.nodes[0].value(), &vec![0.5, 0.5]);
        assert_eq!(built.nodes[1].value(), &vec![1.0, 0.0]);
        assert_eq!(built.nodes[2].value(), &vec![0.0, 1.0]);
        assert!((built.importances[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_depth_gives_root_leaf() {
        let columns = column(&[1.0, 2.0]);
        let labels = [0, 1];
        let outcome = Classification::new(&labels, 2, Criterion::Gini);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let built = build(&columns, &outcome, 2, params(Some(0)), &mut rng);
        assert_eq!(built.nodes.len(), 1);
        assert!(built.nodes[0].is_leaf());
    }

    #[test]
    fn zero_columns_give_root_leaf() {
        let targets = [1.0, 2.0, 3.0];
        let outcome = Regression::new(&targets, Criterion::Mse);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let built = build(&[], &outcome, 3, params(None), &mut rng);
        assert_eq!(built.nodes.len(), 1);
        assert!((built.nodes[0].value() - 2.0).abs() < 1e-12);
        assert!(built.importances.is_empty());
    }

    #[test]
    fn rejected_split_still_credits_importance() {
        let columns = column(&[1.0, 2.0, 3.0, 4.0]);
        let labels = [0, 0, 1, 1];
        let outcome = Classification::new(&labels, 2, Criterion::Gini);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let built = build(
            &columns,
            &outcome,
            4,
            BuildParams {
                min_impurity_decrease: 0.9,
                ..params(None)
            },
            &mut rng,
        );
        assert_eq!(built.nodes.len(), 1);
        assert!((built.importances[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn importance_weighted_by_node_share() {
        // Root splits 6 rows on x <= 3.5; the right child (3 rows) then
        // splits off label 2 with gain 4/9 at half weight.
        let columns = column(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let labels = [0, 0, 0, 1, 1, 2];
        let outcome = Classification::new(&labels, 3, Criterion::Gini);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let built = build(&columns, &outcome, 6, params(None), &mut rng);

        let root_gini = 1.0 - (0.25 + 1.0 / 9.0 + 1.0 / 36.0);
        let root_gain = root_gini - 0.5 * (1.0 - (4.0 / 9.0 + 1.0 / 9.0));
        let child_gain = 1.0 - (4.0 / 9.0 + 1.0 / 9.0);
        let expected = root_gain + 0.5 * child_gain;
        assert!((built.importances[0] - expected).abs() < 1e-12);
    }
}

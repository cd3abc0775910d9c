//! Task strategies shared by split search and the tree builder.
//!
//! An [`Outcome`] knows how to summarize the targets of a sample set into
//! incremental statistics, and how to turn those statistics into an
//! impurity, a leaf payload, and the scalar score used to rank categories.
//! Split search and the builder are generic over it, so neither inspects
//! the task at run time.

use crate::criterion::Criterion;

pub(crate) trait Outcome: Sync {
    /// Payload stored in every node.
    type Leaf: Clone + Send + Sync + std::fmt::Debug;
    /// Incremental summary of a sample set.
    type Stats: Clone;

    fn empty_stats(&self) -> Self::Stats;
    fn add(&self, stats: &mut Self::Stats, sample: usize);
    fn remove(&self, stats: &mut Self::Stats, sample: usize);
    fn count(&self, stats: &Self::Stats) -> usize;
    fn impurity(&self, stats: &Self::Stats) -> f64;
    fn leaf_value(&self, stats: &Self::Stats) -> Self::Leaf;
    /// Surrogate used to order categories before prefix splitting.
    fn category_score(&self, stats: &Self::Stats) -> f64;

    fn stats_of(&self, samples: &[usize]) -> Self::Stats {
        let mut stats = self.empty_stats();
        for &s in samples {
            self.add(&mut stats, s);
        }
        stats
    }

    /// Impurity of a node's full sample set, exact for pure nodes.
    fn node_impurity(&self, samples: &[usize]) -> f64 {
        self.impurity(&self.stats_of(samples))
    }
}

/// Classification over encoded class indices.
pub(crate) struct Classification<'a> {
    targets: &'a [usize],
    n_classes: usize,
    criterion: Criterion,
}

impl<'a> Classification<'a> {
    pub(crate) fn new(targets: &'a [usize], n_classes: usize, criterion: Criterion) -> Self {
        Self {
            targets,
            n_classes,
            criterion,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ClassStats {
    counts: Vec<usize>,
    n: usize,
}

impl Outcome for Classification<'_> {
    type Leaf = Vec<f64>;
    type Stats = ClassStats;

    fn empty_stats(&self) -> ClassStats {
        ClassStats {
            counts: vec![0; self.n_classes],
            n: 0,
        }
    }

    fn add(&self, stats: &mut ClassStats, sample: usize) {
        stats.counts[self.targets[sample]] += 1;
        stats.n += 1;
    }

    fn remove(&self, stats: &mut ClassStats, sample: usize) {
        stats.counts[self.targets[sample]] -= 1;
        stats.n -= 1;
    }

    fn count(&self, stats: &ClassStats) -> usize {
        stats.n
    }

    fn impurity(&self, stats: &ClassStats) -> f64 {
        self.criterion.class_impurity(&stats.counts, stats.n)
    }

    fn leaf_value(&self, stats: &ClassStats) -> Vec<f64> {
        if stats.n == 0 {
            return vec![0.0; self.n_classes];
        }
        let total = stats.n as f64;
        stats.counts.iter().map(|&c| c as f64 / total).collect()
    }

    fn category_score(&self, stats: &ClassStats) -> f64 {
        match (stats.counts.first(), stats.n) {
            (Some(&c), n) if n > 0 => c as f64 / n as f64,
            _ => 0.0,
        }
    }
}

/// Regression over scalar targets.
pub(crate) struct Regression<'a> {
    targets: &'a [f64],
    criterion: Criterion,
}

impl<'a> Regression<'a> {
    pub(crate) fn new(targets: &'a [f64], criterion: Criterion) -> Self {
        Self { targets, criterion }
    }
}

/// Running count, mean, and sum of squared deviations (Welford), so
/// targets with a large common offset keep their spread.
#[derive(Debug, Clone)]
pub(crate) struct RegressionStats {
    n: usize,
    mean: f64,
    m2: f64,
    // Only maintained for MAE, which has no running form.
    values: Vec<f64>,
}

impl RegressionStats {
    fn mean(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.mean }
    }
}

impl Outcome for Regression<'_> {
    type Leaf = f64;
    type Stats = RegressionStats;

    fn empty_stats(&self) -> RegressionStats {
        RegressionStats {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            values: Vec::new(),
        }
    }

    fn add(&self, stats: &mut RegressionStats, sample: usize) {
        let y = self.targets[sample];
        stats.n += 1;
        let delta = y - stats.mean;
        stats.mean += delta / stats.n as f64;
        stats.m2 += delta * (y - stats.mean);
        if self.criterion == Criterion::Mae {
            stats.values.push(y);
        }
    }

    fn remove(&self, stats: &mut RegressionStats, sample: usize) {
        let y = self.targets[sample];
        stats.n -= 1;
        if stats.n == 0 {
            stats.mean = 0.0;
            stats.m2 = 0.0;
        } else {
            let delta = y - stats.mean;
            stats.mean -= delta / stats.n as f64;
            stats.m2 -= delta * (y - stats.mean);
        }
        if self.criterion == Criterion::Mae
            && let Some(pos) = stats.values.iter().position(|v| v.to_bits() == y.to_bits())
        {
            stats.values.swap_remove(pos);
        }
    }

    fn count(&self, stats: &RegressionStats) -> usize {
        stats.n
    }

    fn impurity(&self, stats: &RegressionStats) -> f64 {
        if stats.n == 0 {
            return 0.0;
        }
        match self.criterion {
            Criterion::Mae => self.criterion.value_impurity(&stats.values),
            _ => (stats.m2 / stats.n as f64).max(0.0),
        }
    }

    fn leaf_value(&self, stats: &RegressionStats) -> f64 {
        stats.mean()
    }

    fn category_score(&self, stats: &RegressionStats) -> f64 {
        stats.mean()
    }

    fn node_impurity(&self, samples: &[usize]) -> f64 {
        let values: Vec<f64> = samples.iter().map(|&s| self.targets[s]).collect();
        self.criterion.value_impurity(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_stats_add_remove() {
        let targets = [0, 1, 1, 0, 1];
        let outcome = Classification::new(&targets, 2, Criterion::Gini);
        let mut stats = outcome.stats_of(&[0, 1, 2, 3, 4]);
        assert_eq!(outcome.count(&stats), 5);
        outcome.remove(&mut stats, 0);
        outcome.remove(&mut stats, 3);
        assert_eq!(outcome.impurity(&stats), 0.0);
        assert_eq!(outcome.leaf_value(&stats), vec![0.0, 1.0]);
    }

    #[test]
    fn class_leaf_of_empty_set_is_all_zero() {
        let targets = [0, 1];
        let outcome = Classification::new(&targets, 2, Criterion::Gini);
        assert_eq!(outcome.leaf_value(&outcome.empty_stats()), vec![0.0, 0.0]);
    }

    #[test]
    fn class_score_is_first_label_probability() {
        let targets = [0, 1, 1, 1];
        let outcome = Classification::new(&targets, 2, Criterion::Entropy);
        let stats = outcome.stats_of(&[0, 1, 2, 3]);
        assert!((outcome.category_score(&stats) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn regression_running_mse_matches_two_pass() {
        let targets = [1.0, 4.0, 2.0, 9.0, 3.0];
        let outcome = Regression::new(&targets, Criterion::Mse);
        let mut stats = outcome.stats_of(&[0, 1, 2, 3, 4]);
        outcome.remove(&mut stats, 3);
        let expected = crate::criterion::mse(&[1.0, 4.0, 2.0, 3.0]);
        assert!((outcome.impurity(&stats) - expected).abs() < 1e-12);
        assert!((outcome.leaf_value(&stats) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn regression_running_mse_survives_large_offset() {
        let targets: Vec<f64> = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]
            .iter()
            .map(|d| 1e9 + d)
            .collect();
        let outcome = Regression::new(&targets, Criterion::Mse);
        let mut stats = outcome.stats_of(&[0, 1, 2, 3, 4, 5]);
        assert!((outcome.impurity(&stats) - 0.25).abs() < 1e-9);
        for sample in [0, 1, 2] {
            outcome.remove(&mut stats, sample);
        }
        assert!(outcome.impurity(&stats).abs() < 1e-9);
        assert!((outcome.leaf_value(&stats) - (1e9 + 1.0)).abs() < 1e-6);
        for sample in [3, 4] {
            outcome.remove(&mut stats, sample);
        }
        outcome.remove(&mut stats, 5);
        assert_eq!(outcome.count(&stats), 0);
        assert_eq!(outcome.impurity(&stats), 0.0);
    }

    #[test]
    fn regression_mae_tracks_members() {
        let targets = [1.0, 2.0, 3.0, 10.0];
        let outcome = Regression::new(&targets, Criterion::Mae);
        let mut stats = outcome.stats_of(&[0, 1, 2, 3]);
        outcome.remove(&mut stats, 3);
        let expected = crate::criterion::mae(&[1.0, 2.0, 3.0]);
        assert!((outcome.impurity(&stats) - expected).abs() < 1e-12);
    }

    #[test]
    fn regression_node_impurity_exact_for_identical_targets() {
        let targets = [0.1, 0.1, 0.1];
        let outcome = Regression::new(&targets, Criterion::Mse);
        assert_eq!(outcome.node_impurity(&[0, 1, 2]), 0.0);
    }
}

//! Configuration builders for single trees and forests.

use tracing::warn;

use crate::criterion::Criterion;
use crate::error::TreeError;
use crate::value::FeatureType;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidMaxFeatures`] when the count falls outside
    /// `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, TreeError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) if f > 0.0 && f <= 1.0 => {
                (n_features as f64 * f).ceil() as usize
            }
            MaxFeatures::Fraction(_) => 0,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(TreeError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for a single decision tree.
///
/// Construct via [`TreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter               | Default                          |
/// |-------------------------|----------------------------------|
/// | `criterion`             | task default (`Gini` / `Mse`)    |
/// | `max_depth`             | `None` (unlimited)               |
/// | `min_samples_split`     | 2                                |
/// | `min_samples_leaf`      | 1                                |
/// | `min_impurity_decrease` | 0.0                              |
/// | `max_features`          | `All`                            |
/// | `ccp_alpha`             | 0.0 (no pruning)                 |
/// | `feature_types`         | `None` (inferred per column)     |
/// | `seed`                  | 42                               |
#[derive(Debug, Clone, PartialEq)]
pub struct TreeConfig {
    pub(crate) criterion: Option<Criterion>,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) min_impurity_decrease: f64,
    pub(crate) max_features: MaxFeatures,
    pub(crate) ccp_alpha: f64,
    pub(crate) feature_types: Option<Vec<FeatureType>>,
    pub(crate) seed: u64,
}

impl TreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_impurity_decrease: 0.0,
            max_features: MaxFeatures::All,
            ccp_alpha: 0.0,
            feature_types: None,
            seed: 42,
        }
    }

    // --- Setters ---

    /// Set the impurity criterion.
    ///
    /// A criterion that does not fit the task is replaced by the task
    /// default at fit time, with a warning.
    #[must_use]
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the gain a split must exceed to be kept.
    #[must_use]
    pub fn with_min_impurity_decrease(mut self, min_impurity_decrease: f64) -> Self {
        self.min_impurity_decrease = min_impurity_decrease;
        self
    }

    /// Set how many features are drawn as candidates at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the cost-complexity pruning strength. 0.0 disables pruning.
    #[must_use]
    pub fn with_ccp_alpha(mut self, ccp_alpha: f64) -> Self {
        self.ccp_alpha = ccp_alpha;
        self
    }

    /// Declare the type of every feature column.
    #[must_use]
    pub fn with_feature_types(mut self, feature_types: Option<Vec<FeatureType>>) -> Self {
        self.feature_types = feature_types;
        self
    }

    /// Set the random seed used for feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the configured criterion, if one was set.
    #[must_use]
    pub fn criterion(&self) -> Option<Criterion> {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the minimum gain for a split to be kept.
    #[must_use]
    pub fn min_impurity_decrease(&self) -> f64 {
        self.min_impurity_decrease
    }

    /// Return the feature subsampling strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the pruning strength.
    #[must_use]
    pub fn ccp_alpha(&self) -> f64 {
        self.ccp_alpha
    }

    /// Return the declared feature types, if any.
    #[must_use]
    pub fn feature_types(&self) -> Option<&[FeatureType]> {
        self.feature_types.as_deref()
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the scalar hyperparameters.
    pub(crate) fn validate(&self) -> Result<(), TreeError> {
        if self.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        if !self.min_impurity_decrease.is_finite() || self.min_impurity_decrease < 0.0 {
            return Err(TreeError::InvalidMinImpurityDecrease {
                value: self.min_impurity_decrease,
            });
        }
        if !self.ccp_alpha.is_finite() || self.ccp_alpha < 0.0 {
            return Err(TreeError::InvalidCcpAlpha {
                ccp_alpha: self.ccp_alpha,
            });
        }
        Ok(())
    }

    /// Criterion for a classifier: Gini unless Entropy was requested.
    pub(crate) fn classification_criterion(&self) -> Criterion {
        match self.criterion {
            None => Criterion::Gini,
            Some(c) if c.is_classification() => c,
            Some(c) => {
                warn!(requested = %c, "criterion not valid for classification, using gini");
                Criterion::Gini
            }
        }
    }

    /// Criterion for a regressor: MSE unless MAE was requested.
    pub(crate) fn regression_criterion(&self) -> Criterion {
        match self.criterion {
            None => Criterion::Mse,
            Some(c) if !c.is_classification() => c,
            Some(c) => {
                warn!(requested = %c, "criterion not valid for regression, using mse");
                Criterion::Mse
            }
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a bagged forest.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter      | Default                                   |
/// |----------------|-------------------------------------------|
/// | `tree`         | [`TreeConfig::new`]                       |
/// | `max_features` | `Sqrt` for classifiers, `All` for regressors |
/// | `bootstrap`    | `true`                                    |
/// | `seed`         | 42                                        |
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub(crate) n_estimators: usize,
    pub(crate) tree: TreeConfig,
    pub(crate) max_features: Option<MaxFeatures>,
    pub(crate) bootstrap: bool,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidEstimatorCount`] if `n_estimators` is zero.
    pub fn new(n_estimators: usize) -> Result<Self, TreeError> {
        if n_estimators == 0 {
            return Err(TreeError::InvalidEstimatorCount { n_estimators });
        }
        Ok(Self {
            n_estimators,
            tree: TreeConfig::new(),
            max_features: None,
            bootstrap: true,
            seed: 42,
        })
    }

    /// Set the per-tree hyperparameters. The tree's own seed and
    /// `max_features` are overridden per member.
    #[must_use]
    pub fn with_tree_config(mut self, tree: TreeConfig) -> Self {
        self.tree = tree;
        self
    }

    /// Set the feature subsampling strategy used at every split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Enable or disable bootstrap resampling of the training rows.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the per-tree hyperparameters.
    #[must_use]
    pub fn tree_config(&self) -> &TreeConfig {
        &self.tree
    }

    /// Return the explicit feature subsampling strategy, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<MaxFeatures> {
        self.max_features
    }

    /// Return whether trees train on bootstrap samples.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Return the master random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

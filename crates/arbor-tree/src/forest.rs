//! Bagged forests with parallel tree construction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::classifier::{DecisionTreeClassifier, argmax, encode_labels};
use crate::config::{ForestConfig, MaxFeatures, TreeConfig};
use crate::error::TreeError;
use crate::importance::mean_importances;
use crate::matrix::prepare;
use crate::regressor::{DecisionTreeRegressor, check_targets};
use crate::value::{FeatureType, FeatureValue, Label};

/// Draw `n_samples` row indices with replacement.
fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Validated inputs shared by every member fit.
struct Plan {
    n_features: usize,
    feature_types: Vec<FeatureType>,
    max_features: MaxFeatures,
}

/// Validate the forest configuration against the data and resolve the
/// per-member column types and feature subsampling.
fn plan(
    config: &ForestConfig,
    x: &[Vec<FeatureValue>],
    n_targets: usize,
    default_max_features: MaxFeatures,
) -> Result<Plan, TreeError> {
    config.tree.validate()?;
    let prepared = prepare(x, n_targets, config.tree.feature_types())?;
    let max_features = config.max_features.unwrap_or(default_max_features);
    if prepared.n_features > 0 {
        max_features.resolve(prepared.n_features)?;
    }
    Ok(Plan {
        n_features: prepared.n_features,
        feature_types: prepared.feature_types,
        max_features,
    })
}

/// Fit `config.n_estimators` members in parallel.
///
/// Per-member seeds come from a master `ChaCha8Rng`; each member draws its
/// bootstrap rows and its own tree seed from a generator seeded with that.
fn fit_members<M, F>(
    config: &ForestConfig,
    plan: &Plan,
    n_samples: usize,
    fit_one: F,
) -> Result<Vec<M>, TreeError>
where
    M: Send,
    F: Fn(TreeConfig, Option<&[usize]>) -> Result<M, TreeError> + Sync,
{
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let member_seeds: Vec<u64> = (0..config.n_estimators)
        .map(|_| master_rng.r#gen())
        .collect();
    let bootstrap = config.bootstrap;

    member_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rows = bootstrap.then(|| bootstrap_indices(n_samples, &mut rng));
            let tree_config = config
                .tree
                .clone()
                .with_feature_types(Some(plan.feature_types.clone()))
                .with_max_features(plan.max_features)
                .with_seed(rng.r#gen());
            fit_one(tree_config, rows.as_deref())
        })
        .collect()
}

fn select<T: Clone>(values: &[T], rows: Option<&[usize]>) -> Vec<T> {
    match rows {
        Some(rows) => rows.iter().map(|&i| values[i].clone()).collect(),
        None => values.to_vec(),
    }
}

/// A bagged ensemble of [`DecisionTreeClassifier`]s.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    pub(crate) config: ForestConfig,
    pub(crate) fitted: Option<FittedForest<DecisionTreeClassifier>>,
}

/// A bagged ensemble of [`DecisionTreeRegressor`]s.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    pub(crate) config: ForestConfig,
    pub(crate) fitted: Option<FittedForest<DecisionTreeRegressor>>,
}

#[derive(Debug, Clone)]
pub(crate) struct FittedForest<M> {
    pub(crate) trees: Vec<M>,
    pub(crate) n_features: usize,
    /// Sorted labels over the whole training set; empty for regression.
    pub(crate) classes: Vec<Label>,
}

impl RandomForestClassifier {
    /// Create an unfitted forest.
    #[must_use]
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Return the forest configuration.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Train every member, replacing any previous fit.
    ///
    /// Feature subsampling defaults to [`MaxFeatures::Sqrt`].
    ///
    /// # Errors
    ///
    /// The validation errors of
    /// [`DecisionTreeClassifier::fit`](crate::DecisionTreeClassifier::fit),
    /// checked once before any member is trained.
    #[instrument(skip_all, fields(n_estimators = self.config.n_estimators, n_samples = x.len()))]
    pub fn fit(&mut self, x: &[Vec<FeatureValue>], y: &[Label]) -> Result<(), TreeError> {
        self.fitted = None;
        let plan = plan(&self.config, x, y.len(), MaxFeatures::Sqrt)?;
        let (classes, _) = encode_labels(y);

        info!(
            n_features = plan.n_features,
            n_classes = classes.len(),
            bootstrap = self.config.bootstrap,
            "training random forest classifier"
        );

        let trees = fit_members(&self.config, &plan, x.len(), |tree_config, rows| {
            let mut tree = DecisionTreeClassifier::new(tree_config);
            tree.fit(&select(x, rows), &select(y, rows))?;
            Ok(tree)
        })?;

        debug!(n_trees_trained = trees.len(), "tree training complete");
        self.fitted = Some(FittedForest {
            trees,
            n_features: plan.n_features,
            classes,
        });
        Ok(())
    }

    pub(crate) fn fitted(&self) -> Result<&FittedForest<DecisionTreeClassifier>, TreeError> {
        self.fitted.as_ref().ok_or(TreeError::NotFitted)
    }

    fn class_position(classes: &[Label], label: &Label) -> Result<usize, TreeError> {
        classes
            .binary_search(label)
            .map_err(|_| TreeError::malformed(format!("member predicts unknown label {label}")))
    }

    /// Majority vote of the members' predictions; ties go to the first
    /// label in sorted order.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`; routing errors from any member.
    pub fn predict_one(&self, sample: &[FeatureValue]) -> Result<Label, TreeError> {
        let fitted = self.fitted()?;
        let mut votes = vec![0.0f64; fitted.classes.len()];
        for tree in &fitted.trees {
            let label = tree.predict_one(sample)?;
            votes[Self::class_position(&fitted.classes, &label)?] += 1.0;
        }
        fitted
            .classes
            .get(argmax(&votes))
            .cloned()
            .ok_or_else(|| TreeError::malformed("forest has no classes"))
    }

    /// Predict labels for every row of `x` in parallel.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict(&self, x: &[Vec<FeatureValue>]) -> Result<Vec<Label>, TreeError> {
        x.par_iter().map(|row| self.predict_one(row)).collect()
    }

    /// Mean of the members' class distributions, ordered like
    /// [`classes`](Self::classes). Labels a member never saw count as 0.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict_proba_one(&self, sample: &[FeatureValue]) -> Result<Vec<f64>, TreeError> {
        let fitted = self.fitted()?;
        let mut avg = vec![0.0f64; fitted.classes.len()];
        for tree in &fitted.trees {
            let proba = tree.predict_proba_one(sample)?;
            for (label, p) in tree.classes().iter().zip(proba) {
                avg[Self::class_position(&fitted.classes, label)?] += p;
            }
        }
        let n = fitted.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(avg)
    }

    /// Class probabilities for every row of `x` in parallel.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict_proba(&self, x: &[Vec<FeatureValue>]) -> Result<Vec<Vec<f64>>, TreeError> {
        x.par_iter().map(|row| self.predict_proba_one(row)).collect()
    }

    /// Mean of the members' normalized importances.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFitted`] before `fit`.
    pub fn feature_importances(&self) -> Result<Vec<f64>, TreeError> {
        let fitted = self.fitted()?;
        let per_tree = fitted
            .trees
            .iter()
            .map(DecisionTreeClassifier::feature_importances)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(mean_importances(&per_tree, fitted.n_features))
    }

    /// Sorted labels seen during `fit`; empty before `fit`.
    #[must_use]
    pub fn classes(&self) -> &[Label] {
        self.fitted.as_ref().map_or(&[], |f| f.classes.as_slice())
    }

    /// The fitted members; empty before `fit`.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeClassifier] {
        self.fitted.as_ref().map_or(&[], |f| f.trees.as_slice())
    }

    /// Feature column count seen during `fit`.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_features)
    }

    /// Total nodes across members.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.trees().iter().map(DecisionTreeClassifier::n_nodes).sum()
    }

    /// Total leaves across members.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.trees().iter().map(DecisionTreeClassifier::n_leaves).sum()
    }

    /// Depth of the deepest member.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.trees().iter().map(DecisionTreeClassifier::depth).max().unwrap_or(0)
    }
}

impl RandomForestRegressor {
    /// Create an unfitted forest.
    #[must_use]
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Return the forest configuration.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Train every member, replacing any previous fit.
    ///
    /// Feature subsampling defaults to [`MaxFeatures::All`].
    ///
    /// # Errors
    ///
    /// The validation errors of
    /// [`DecisionTreeRegressor::fit`](crate::DecisionTreeRegressor::fit),
    /// checked once before any member is trained.
    #[instrument(skip_all, fields(n_estimators = self.config.n_estimators, n_samples = x.len()))]
    pub fn fit(&mut self, x: &[Vec<FeatureValue>], y: &[f64]) -> Result<(), TreeError> {
        self.fitted = None;
        let plan = plan(&self.config, x, y.len(), MaxFeatures::All)?;
        check_targets(y)?;

        info!(
            n_features = plan.n_features,
            bootstrap = self.config.bootstrap,
            "training random forest regressor"
        );

        let trees = fit_members(&self.config, &plan, x.len(), |tree_config, rows| {
            let mut tree = DecisionTreeRegressor::new(tree_config);
            tree.fit(&select(x, rows), &select(y, rows))?;
            Ok(tree)
        })?;

        debug!(n_trees_trained = trees.len(), "tree training complete");
        self.fitted = Some(FittedForest {
            trees,
            n_features: plan.n_features,
            classes: Vec::new(),
        });
        Ok(())
    }

    pub(crate) fn fitted(&self) -> Result<&FittedForest<DecisionTreeRegressor>, TreeError> {
        self.fitted.as_ref().ok_or(TreeError::NotFitted)
    }

    /// Mean of the members' predictions.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`; routing errors from any member.
    pub fn predict_one(&self, sample: &[FeatureValue]) -> Result<f64, TreeError> {
        let fitted = self.fitted()?;
        let mut total = 0.0;
        for tree in &fitted.trees {
            total += tree.predict_one(sample)?;
        }
        Ok(total / fitted.trees.len() as f64)
    }

    /// Predict targets for every row of `x` in parallel.
    ///
    /// # Errors
    ///
    /// See [`predict_one`](Self::predict_one).
    pub fn predict(&self, x: &[Vec<FeatureValue>]) -> Result<Vec<f64>, TreeError> {
        x.par_iter().map(|row| self.predict_one(row)).collect()
    }

    /// Mean of the members' normalized importances.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFitted`] before `fit`.
    pub fn feature_importances(&self) -> Result<Vec<f64>, TreeError> {
        let fitted = self.fitted()?;
        let per_tree = fitted
            .trees
            .iter()
            .map(DecisionTreeRegressor::feature_importances)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(mean_importances(&per_tree, fitted.n_features))
    }

    /// The fitted members; empty before `fit`.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeRegressor] {
        self.fitted.as_ref().map_or(&[], |f| f.trees.as_slice())
    }

    /// Feature column count seen during `fit`.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_features)
    }

    /// Total nodes across members.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.trees().iter().map(DecisionTreeRegressor::n_nodes).sum()
    }

    /// Total leaves across members.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.trees().iter().map(DecisionTreeRegressor::n_leaves).sum()
    }

    /// Depth of the deepest member.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.trees().iter().map(DecisionTreeRegressor::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::numeric_matrix;

    /// Three separable classes on feature 0; feature 1 is constant.
    fn make_separable_data() -> (Vec<Vec<FeatureValue>>, Vec<Label>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (class, base) in [("low", 0.0), ("mid", 10.0), ("high", 20.0)] {
            for i in 0..20 {
                rows.push(vec![base + f64::from(i) * 0.15, 0.5]);
                labels.push(Label::from(class));
            }
        }
        (numeric_matrix(&rows), labels)
    }

    fn forest(n_estimators: usize, seed: u64) -> RandomForestClassifier {
        RandomForestClassifier::new(ForestConfig::new(n_estimators).unwrap().with_seed(seed))
    }

    #[test]
    fn bootstrap_draws_same_size_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rows = bootstrap_indices(50, &mut rng);
        assert_eq!(rows.len(), 50);
        assert!(rows.iter().all(|&i| i < 50));
    }

    #[test]
    fn separable_data_high_accuracy() {
        let (x, y) = make_separable_data();
        let mut rf = forest(10, 42);
        rf.fit(&x, &y).unwrap();
        let pred = rf.predict(&x).unwrap();
        let correct = pred.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / y.len() as f64 > 0.95);
    }

    #[test]
    fn same_seed_same_model() {
        let (x, y) = make_separable_data();
        let mut a = forest(8, 3);
        let mut b = forest(8, 3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let queries = numeric_matrix(&[vec![4.0, 0.5], vec![14.5, 0.5], vec![9.0, 0.5]]);
        assert_eq!(a.predict_proba(&queries).unwrap(), b.predict_proba(&queries).unwrap());
        assert_eq!(a.feature_importances().unwrap(), b.feature_importances().unwrap());
    }

    #[test]
    fn proba_rows_sum_to_one() {
        let (x, y) = make_separable_data();
        let mut rf = forest(6, 11);
        rf.fit(&x, &y).unwrap();
        for row in rf.predict_proba(&x).unwrap() {
            assert_eq!(row.len(), 3);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn importances_favor_informative_feature() {
        let (x, y) = make_separable_data();
        let mut rf = forest(10, 42);
        rf.fit(&x, &y).unwrap();
        let imp = rf.feature_importances().unwrap();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn without_bootstrap_members_share_rows() {
        let (x, y) = make_separable_data();
        let config = ForestConfig::new(3)
            .unwrap()
            .with_bootstrap(false)
            .with_max_features(MaxFeatures::All);
        let mut rf = RandomForestClassifier::new(config);
        rf.fit(&x, &y).unwrap();
        for tree in rf.trees() {
            assert_eq!(tree.nodes().unwrap()[0].n_samples(), 60);
        }
    }

    #[test]
    fn invalid_max_features_rejected_up_front() {
        let (x, y) = make_separable_data();
        let config = ForestConfig::new(3).unwrap().with_max_features(MaxFeatures::Fixed(5));
        let err = RandomForestClassifier::new(config).fit(&x, &y).unwrap_err();
        assert!(matches!(err, TreeError::InvalidMaxFeatures { max_features: 5, n_features: 2 }));
    }

    #[test]
    fn regressor_averages_members() {
        let x = numeric_matrix(&(0..30).map(|i| vec![f64::from(i)]).collect::<Vec<_>>());
        let y: Vec<f64> = (0..30).map(|i| if i < 15 { 1.0 } else { 9.0 }).collect();
        let mut rf = RandomForestRegressor::new(ForestConfig::new(10).unwrap());
        rf.fit(&x, &y).unwrap();
        let low = rf.predict_one(&[FeatureValue::Numeric(2.0)]).unwrap();
        let high = rf.predict_one(&[FeatureValue::Numeric(27.0)]).unwrap();
        assert!(low < 3.0, "got {low}");
        assert!(high > 7.0, "got {high}");
    }

    #[test]
    fn not_fitted() {
        let rf = forest(2, 1);
        assert!(matches!(rf.predict(&[vec![]]), Err(TreeError::NotFitted)));
        assert!(matches!(rf.feature_importances(), Err(TreeError::NotFitted)));
        let reg = RandomForestRegressor::new(ForestConfig::new(2).unwrap());
        assert!(matches!(reg.predict_one(&[]), Err(TreeError::NotFitted)));
    }
}

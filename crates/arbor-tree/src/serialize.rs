//! JSON persistence for trees and forests.
//!
//! A tree document nests its nodes: leaves carry `value`, splits carry
//! `potentialLeafValue`, a rule (`threshold` or `leftCategorySet`) and both
//! children. Forest documents hold one tree document per member.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::classifier::{DecisionTreeClassifier, FittedClassifier};
use crate::config::{ForestConfig, MaxFeatures, TreeConfig};
use crate::criterion::Criterion;
use crate::error::TreeError;
use crate::forest::{FittedForest, RandomForestClassifier, RandomForestRegressor};
use crate::node::{FeatureIndex, Impurity, Node, NodeIndex, SplitRule};
use crate::regressor::DecisionTreeRegressor;
use crate::tree::Tree;
use crate::value::{FeatureType, Label};

const CLASSIFIER_TAG: &str = "classifier";
const REGRESSOR_TAG: &str = "regressor";
const FOREST_CLASSIFIER_TAG: &str = "randomForestClassifier";
const FOREST_REGRESSOR_TAG: &str = "randomForestRegressor";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "V: serde::Deserialize<'de>"))]
struct NodeRecord<V> {
    impurity: f64,
    samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<V>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    potential_leaf_value: Option<V>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left_category_set: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left_child: Option<Box<NodeRecord<V>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right_child: Option<Box<NodeRecord<V>>>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "V: serde::Deserialize<'de>"))]
struct TreeDocument<V> {
    #[serde(rename = "type")]
    model_type: String,
    root: NodeRecord<V>,
    criterion: Criterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    min_impurity_decrease: f64,
    n_features: usize,
    feature_types: Vec<FeatureType>,
    ccp_alpha: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unique_classes: Option<Vec<Label>>,
    #[serde(default)]
    feature_importances: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_features: Option<MaxFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "V: serde::Deserialize<'de>"))]
struct ForestDocument<V> {
    #[serde(rename = "type")]
    model_type: String,
    n_estimators: usize,
    bootstrap: bool,
    seed: u64,
    n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_features: Option<MaxFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unique_classes: Option<Vec<Label>>,
    trees: Vec<TreeDocument<V>>,
}

#[derive(serde::Deserialize)]
struct TypeTag {
    #[serde(rename = "type")]
    model_type: String,
}

/// Read the `type` tag of a persisted model without decoding the rest.
///
/// # Errors
///
/// Returns [`TreeError::DeserializeModel`] when `json` is not an object with
/// a string `type` field.
pub fn model_type(json: &str) -> Result<String, TreeError> {
    serde_json::from_str::<TypeTag>(json)
        .map(|tag| tag.model_type)
        .map_err(|source| TreeError::DeserializeModel { source })
}

fn expect_type(found: &str, expected: &str) -> Result<(), TreeError> {
    if found != expected {
        return Err(TreeError::ModelTypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

fn to_string<T: Serialize>(doc: &T) -> Result<String, TreeError> {
    serde_json::to_string(doc).map_err(|source| TreeError::SerializeModel { source })
}

fn decode<T: DeserializeOwned>(json: &str, expected: &str) -> Result<T, TreeError> {
    expect_type(&model_type(json)?, expected)?;
    serde_json::from_str(json).map_err(|source| TreeError::DeserializeModel { source })
}

// --- arena <-> nested records ---

/// Nest the arena below `idx`. `finite` vets each payload, since JSON has
/// no encoding for NaN or infinities.
fn record_of<V: Clone>(
    nodes: &[Node<V>],
    idx: usize,
    finite: &impl Fn(&V) -> bool,
) -> Result<NodeRecord<V>, TreeError> {
    let node = nodes
        .get(idx)
        .ok_or_else(|| TreeError::malformed(format!("node {idx} does not exist")))?;
    let non_finite = |field| TreeError::NonFiniteModelValue { node: idx, field };
    let impurity = node.impurity().value();
    if !impurity.is_finite() {
        return Err(non_finite("impurity"));
    }
    let mut record = NodeRecord {
        impurity,
        samples: node.n_samples(),
        value: None,
        potential_leaf_value: None,
        feature_index: None,
        threshold: None,
        left_category_set: None,
        left_child: None,
        right_child: None,
    };
    match node {
        Node::Leaf { value, .. } => {
            if !finite(value) {
                return Err(non_finite("value"));
            }
            record.value = Some(value.clone());
        }
        Node::Split {
            feature,
            rule,
            left,
            right,
            value,
            ..
        } => {
            if !finite(value) {
                return Err(non_finite("potentialLeafValue"));
            }
            record.potential_leaf_value = Some(value.clone());
            record.feature_index = Some(feature.index());
            match rule {
                SplitRule::Threshold(t) if !t.is_finite() => return Err(non_finite("threshold")),
                SplitRule::Threshold(t) => record.threshold = Some(*t),
                SplitRule::Categories(set) => {
                    record.left_category_set = Some(set.iter().cloned().collect());
                }
            }
            record.left_child = Some(Box::new(record_of(nodes, left.index(), finite)?));
            record.right_child = Some(Box::new(record_of(nodes, right.index(), finite)?));
        }
    }
    Ok(record)
}

/// Rebuild an arena from a nested record, preorder.
///
/// `check` validates each payload (class-vector length for classifiers).
fn push_record<V: Clone>(
    record: NodeRecord<V>,
    arena: &mut Vec<Node<V>>,
    check: &impl Fn(&V) -> Result<(), TreeError>,
) -> Result<NodeIndex, TreeError> {
    let NodeRecord {
        impurity,
        samples,
        value,
        potential_leaf_value,
        feature_index,
        threshold,
        left_category_set,
        left_child,
        right_child,
    } = record;
    let impurity = Impurity::new(impurity);

    let rule = match (threshold, left_category_set) {
        (Some(_), Some(_)) => {
            return Err(TreeError::malformed(
                "node has both a threshold and a category set",
            ));
        }
        (Some(t), None) => Some(SplitRule::Threshold(t)),
        (None, Some(set)) => Some(SplitRule::Categories(
            set.into_iter().collect::<BTreeSet<_>>(),
        )),
        (None, None) => None,
    };

    let idx = arena.len();
    match (rule, left_child, right_child) {
        (Some(rule), Some(left), Some(right)) => {
            let feature = feature_index
                .ok_or_else(|| TreeError::malformed("split node has no featureIndex"))?;
            let value = potential_leaf_value
                .or(value)
                .ok_or_else(|| TreeError::malformed("split node has no potentialLeafValue"))?;
            check(&value)?;
            // Reserve the parent's slot so children follow it in preorder.
            arena.push(Node::Leaf {
                value: value.clone(),
                impurity,
                n_samples: samples,
            });
            let left = push_record(*left, arena, check)?;
            let right = push_record(*right, arena, check)?;
            arena[idx] = Node::Split {
                feature: FeatureIndex::new(feature),
                rule,
                left,
                right,
                impurity,
                n_samples: samples,
                value,
            };
        }
        (None, Some(_), _) | (None, _, Some(_)) => {
            return Err(TreeError::malformed("node has children but no split rule"));
        }
        (Some(_), Some(_), None) | (Some(_), None, Some(_)) => {
            return Err(TreeError::malformed("split node has only one child"));
        }
        (_, None, None) => {
            let value = value
                .or(potential_leaf_value)
                .ok_or_else(|| TreeError::malformed("leaf node has no value"))?;
            check(&value)?;
            arena.push(Node::Leaf {
                value,
                impurity,
                n_samples: samples,
            });
        }
    }
    Ok(NodeIndex::new(idx))
}

fn tree_document<V: Clone>(
    tree: &Tree<V>,
    config: &TreeConfig,
    model_type: &str,
    classes: Option<&[Label]>,
    finite: &impl Fn(&V) -> bool,
) -> Result<TreeDocument<V>, TreeError> {
    Ok(TreeDocument {
        model_type: model_type.to_string(),
        root: record_of(&tree.nodes, 0, finite)?,
        criterion: tree.criterion,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        min_impurity_decrease: config.min_impurity_decrease,
        n_features: tree.n_features,
        feature_types: tree.feature_types.clone(),
        ccp_alpha: config.ccp_alpha,
        unique_classes: classes.map(<[Label]>::to_vec),
        feature_importances: tree.importances.clone(),
        max_features: Some(config.max_features),
        seed: Some(config.seed),
    })
}

/// Rebuild a tree and its configuration from a decoded document.
fn restore_tree<V: Clone>(
    doc: TreeDocument<V>,
    check: &impl Fn(&V) -> Result<(), TreeError>,
) -> Result<(Tree<V>, TreeConfig), TreeError> {
    if doc.feature_types.len() != doc.n_features {
        return Err(TreeError::malformed(format!(
            "{} feature types for {} features",
            doc.feature_types.len(),
            doc.n_features
        )));
    }
    let importances = match doc.feature_importances.len() {
        0 => vec![0.0; doc.n_features],
        n if n == doc.n_features => doc.feature_importances,
        n => {
            return Err(TreeError::malformed(format!(
                "{n} feature importances for {} features",
                doc.n_features
            )));
        }
    };

    let mut nodes = Vec::new();
    push_record(doc.root, &mut nodes, check)?;
    if let Some(feature) = nodes.iter().find_map(|node| match node {
        Node::Split { feature, .. } if feature.index() >= doc.n_features => Some(feature.index()),
        _ => None,
    }) {
        return Err(TreeError::malformed(format!(
            "split on feature {feature} of a {}-feature model",
            doc.n_features
        )));
    }

    let mut config = TreeConfig::new()
        .with_criterion(doc.criterion)
        .with_max_depth(doc.max_depth)
        .with_min_samples_split(doc.min_samples_split)
        .with_min_samples_leaf(doc.min_samples_leaf)
        .with_min_impurity_decrease(doc.min_impurity_decrease)
        .with_ccp_alpha(doc.ccp_alpha)
        .with_feature_types(Some(doc.feature_types.clone()));
    if let Some(max_features) = doc.max_features {
        config = config.with_max_features(max_features);
    }
    if let Some(seed) = doc.seed {
        config = config.with_seed(seed);
    }

    let tree = Tree {
        nodes,
        n_features: doc.n_features,
        feature_types: doc.feature_types,
        criterion: doc.criterion,
        importances,
    };
    Ok((tree, config))
}

fn class_vector_check(n_classes: usize) -> impl Fn(&Vec<f64>) -> Result<(), TreeError> {
    move |probs: &Vec<f64>| {
        if probs.len() == n_classes {
            Ok(())
        } else {
            Err(TreeError::malformed(format!(
                "class distribution has {} entries for {n_classes} classes",
                probs.len()
            )))
        }
    }
}

fn any_value(_: &f64) -> Result<(), TreeError> {
    Ok(())
}

fn finite_distribution(probs: &Vec<f64>) -> bool {
    probs.iter().all(|p| p.is_finite())
}

fn finite_mean(value: &f64) -> bool {
    value.is_finite()
}

fn classifier_document(
    model: &DecisionTreeClassifier,
) -> Result<TreeDocument<Vec<f64>>, TreeError> {
    let fitted = model.fitted()?;
    tree_document(
        &fitted.tree,
        &model.config,
        CLASSIFIER_TAG,
        Some(&fitted.classes),
        &finite_distribution,
    )
}

fn restore_classifier(doc: TreeDocument<Vec<f64>>) -> Result<DecisionTreeClassifier, TreeError> {
    expect_type(&doc.model_type, CLASSIFIER_TAG)?;
    let classes = doc
        .unique_classes
        .clone()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| TreeError::malformed("classifier has no uniqueClasses"))?;
    if classes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(TreeError::malformed("uniqueClasses is not sorted and unique"));
    }
    let (tree, config) = restore_tree(doc, &class_vector_check(classes.len()))?;
    Ok(DecisionTreeClassifier {
        config,
        fitted: Some(FittedClassifier { tree, classes }),
    })
}

fn regressor_document(model: &DecisionTreeRegressor) -> Result<TreeDocument<f64>, TreeError> {
    tree_document(
        model.fitted()?,
        &model.config,
        REGRESSOR_TAG,
        None,
        &finite_mean,
    )
}

fn restore_regressor(doc: TreeDocument<f64>) -> Result<DecisionTreeRegressor, TreeError> {
    expect_type(&doc.model_type, REGRESSOR_TAG)?;
    let (tree, config) = restore_tree(doc, &any_value)?;
    Ok(DecisionTreeRegressor {
        config,
        tree: Some(tree),
    })
}

/// Member count and feature width must agree with the forest header.
fn check_members<V>(doc: &ForestDocument<V>) -> Result<(), TreeError> {
    if doc.trees.is_empty() || doc.trees.len() != doc.n_estimators {
        return Err(TreeError::malformed(format!(
            "nEstimators is {} but {} trees are stored",
            doc.n_estimators,
            doc.trees.len()
        )));
    }
    if let Some(tree) = doc.trees.iter().find(|t| t.n_features != doc.n_features) {
        return Err(TreeError::malformed(format!(
            "member has {} features, forest has {}",
            tree.n_features, doc.n_features
        )));
    }
    Ok(())
}

fn forest_config<V>(doc: &ForestDocument<V>, member: TreeConfig) -> Result<ForestConfig, TreeError> {
    let mut config = ForestConfig::new(doc.n_estimators)?
        .with_tree_config(member)
        .with_bootstrap(doc.bootstrap)
        .with_seed(doc.seed);
    if let Some(max_features) = doc.max_features {
        config = config.with_max_features(max_features);
    }
    Ok(config)
}

fn forest_document<M, V>(
    config: &ForestConfig,
    fitted: &FittedForest<M>,
    model_type: &str,
    member_document: impl Fn(&M) -> Result<TreeDocument<V>, TreeError>,
) -> Result<ForestDocument<V>, TreeError> {
    let trees = fitted
        .trees
        .iter()
        .map(member_document)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ForestDocument {
        model_type: model_type.to_string(),
        n_estimators: trees.len(),
        bootstrap: config.bootstrap,
        seed: config.seed,
        n_features: fitted.n_features,
        max_features: config.max_features,
        unique_classes: (!fitted.classes.is_empty()).then(|| fitted.classes.clone()),
        trees,
    })
}

fn write_model(path: &Path, json: &str) -> Result<(), TreeError> {
    std::fs::write(path, json).map_err(|source| TreeError::WriteModel {
        path: path.to_path_buf(),
        source,
    })
}

fn read_model(path: &Path) -> Result<String, TreeError> {
    std::fs::read_to_string(path).map_err(|source| TreeError::ReadModel {
        path: path.to_path_buf(),
        source,
    })
}

impl DecisionTreeClassifier {
    /// Serialize the fitted tree to a JSON document.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::NotFitted`] | called before `fit` |
    /// | [`TreeError::NonFiniteModelValue`] | a node holds NaN or an infinity |
    /// | [`TreeError::SerializeModel`] | JSON encoding failed |
    pub fn to_json(&self) -> Result<String, TreeError> {
        to_string(&classifier_document(self)?)
    }

    /// Rebuild a classifier from [`to_json`](Self::to_json) output.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::DeserializeModel`] | invalid JSON or missing fields |
    /// | [`TreeError::ModelTypeMismatch`] | `type` is not `"classifier"` |
    /// | [`TreeError::MalformedTree`] | the node graph is inconsistent |
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        restore_classifier(decode(json, CLASSIFIER_TAG)?)
    }

    /// Write the model as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Errors of [`to_json`](Self::to_json), or [`TreeError::WriteModel`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        let json = self.to_json()?;
        write_model(path.as_ref(), &json)?;
        info!(size_bytes = json.len(), n_nodes = self.n_nodes(), "model saved");
        Ok(())
    }

    /// Read a model written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`TreeError::ReadModel`], or errors of [`from_json`](Self::from_json).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let model = Self::from_json(&read_model(path.as_ref())?)?;
        debug!(n_nodes = model.n_nodes(), n_classes = model.classes().len(), "model loaded");
        Ok(model)
    }
}

impl DecisionTreeRegressor {
    /// Serialize the fitted tree to a JSON document.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`, [`TreeError::NonFiniteModelValue`]
    /// for a NaN or infinite node field, or [`TreeError::SerializeModel`].
    pub fn to_json(&self) -> Result<String, TreeError> {
        to_string(&regressor_document(self)?)
    }

    /// Rebuild a regressor from [`to_json`](Self::to_json) output.
    ///
    /// # Errors
    ///
    /// [`TreeError::DeserializeModel`], [`TreeError::ModelTypeMismatch`]
    /// when `type` is not `"regressor"`, or [`TreeError::MalformedTree`].
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        restore_regressor(decode(json, REGRESSOR_TAG)?)
    }

    /// Write the model as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Errors of [`to_json`](Self::to_json), or [`TreeError::WriteModel`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        let json = self.to_json()?;
        write_model(path.as_ref(), &json)?;
        info!(size_bytes = json.len(), n_nodes = self.n_nodes(), "model saved");
        Ok(())
    }

    /// Read a model written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`TreeError::ReadModel`], or errors of [`from_json`](Self::from_json).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let model = Self::from_json(&read_model(path.as_ref())?)?;
        debug!(n_nodes = model.n_nodes(), "model loaded");
        Ok(model)
    }
}

impl RandomForestClassifier {
    /// Serialize every member to one JSON document.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`, [`TreeError::NonFiniteModelValue`]
    /// for a NaN or infinite node field, or [`TreeError::SerializeModel`].
    pub fn to_json(&self) -> Result<String, TreeError> {
        to_string(&forest_document(
            &self.config,
            self.fitted()?,
            FOREST_CLASSIFIER_TAG,
            classifier_document,
        )?)
    }

    /// Rebuild a forest from [`to_json`](Self::to_json) output.
    ///
    /// # Errors
    ///
    /// [`TreeError::DeserializeModel`], [`TreeError::ModelTypeMismatch`]
    /// when the forest or a member has the wrong `type`, or
    /// [`TreeError::MalformedTree`].
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let mut doc: ForestDocument<Vec<f64>> = decode(json, FOREST_CLASSIFIER_TAG)?;
        check_members(&doc)?;
        let classes = doc
            .unique_classes
            .take()
            .ok_or_else(|| TreeError::malformed("forest has no uniqueClasses"))?;
        let trees = std::mem::take(&mut doc.trees)
            .into_iter()
            .map(restore_classifier)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(label) = trees
            .iter()
            .flat_map(DecisionTreeClassifier::classes)
            .find(|label| classes.binary_search(label).is_err())
        {
            return Err(TreeError::malformed(format!(
                "member class {label} missing from forest classes"
            )));
        }
        let config = forest_config(&doc, trees[0].config.clone())?;
        Ok(Self {
            config,
            fitted: Some(FittedForest {
                trees,
                n_features: doc.n_features,
                classes,
            }),
        })
    }

    /// Write the model as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Errors of [`to_json`](Self::to_json), or [`TreeError::WriteModel`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        let json = self.to_json()?;
        write_model(path.as_ref(), &json)?;
        info!(size_bytes = json.len(), n_trees = self.trees().len(), "model saved");
        Ok(())
    }

    /// Read a model written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`TreeError::ReadModel`], or errors of [`from_json`](Self::from_json).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let model = Self::from_json(&read_model(path.as_ref())?)?;
        debug!(
            n_trees = model.trees().len(),
            n_classes = model.classes().len(),
            "model loaded"
        );
        Ok(model)
    }
}

impl RandomForestRegressor {
    /// Serialize every member to one JSON document.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFitted`] before `fit`, [`TreeError::NonFiniteModelValue`]
    /// for a NaN or infinite node field, or [`TreeError::SerializeModel`].
    pub fn to_json(&self) -> Result<String, TreeError> {
        to_string(&forest_document(
            &self.config,
            self.fitted()?,
            FOREST_REGRESSOR_TAG,
            regressor_document,
        )?)
    }

    /// Rebuild a forest from [`to_json`](Self::to_json) output.
    ///
    /// # Errors
    ///
    /// [`TreeError::DeserializeModel`], [`TreeError::ModelTypeMismatch`]
    /// when the forest or a member has the wrong `type`, or
    /// [`TreeError::MalformedTree`].
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let mut doc: ForestDocument<f64> = decode(json, FOREST_REGRESSOR_TAG)?;
        check_members(&doc)?;
        let trees = std::mem::take(&mut doc.trees)
            .into_iter()
            .map(restore_regressor)
            .collect::<Result<Vec<_>, _>>()?;
        let config = forest_config(&doc, trees[0].config.clone())?;
        Ok(Self {
            config,
            fitted: Some(FittedForest {
                trees,
                n_features: doc.n_features,
                classes: Vec::new(),
            }),
        })
    }

    /// Write the model as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Errors of [`to_json`](Self::to_json), or [`TreeError::WriteModel`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TreeError> {
        let json = self.to_json()?;
        write_model(path.as_ref(), &json)?;
        info!(size_bytes = json.len(), n_trees = self.trees().len(), "model saved");
        Ok(())
    }

    /// Read a model written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`TreeError::ReadModel`], or errors of [`from_json`](Self::from_json).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let model = Self::from_json(&read_model(path.as_ref())?)?;
        debug!(n_trees = model.trees().len(), "model loaded");
        Ok(model)
    }
}

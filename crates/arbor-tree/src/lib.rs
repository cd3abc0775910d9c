//! Decision trees and bagged forests: train, predict, prune, persist.
//!
//! CART trees for classification and regression over mixed numeric and
//! categorical features with missing values. Split search ranks categories
//! to keep subset splits linear, missing values follow the larger child,
//! and fitted trees can be cost-complexity pruned. Forests bag trees with
//! per-split feature subsampling and train members in parallel via rayon.
//! Models round-trip through a JSON document format.

mod builder;
mod classifier;
mod confusion;
mod config;
mod criterion;
mod error;
mod forest;
mod importance;
mod matrix;
pub mod metrics;
mod node;
mod outcome;
mod prune;
mod regressor;
mod serialize;
mod split;
mod tree;
mod value;

pub use classifier::DecisionTreeClassifier;
pub use config::{ForestConfig, MaxFeatures, TreeConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use criterion::{Criterion, entropy, gini, mae, mse};
pub use error::TreeError;
pub use forest::{RandomForestClassifier, RandomForestRegressor};
pub use importance::{RankedFeature, rank_importances};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex, SplitRule};
pub use regressor::DecisionTreeRegressor;
pub use serialize::model_type;
pub use value::{FeatureType, FeatureValue, Label, numeric_matrix};

use std::path::PathBuf;

/// Errors from tree and forest training, prediction, and persistence.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when n_estimators is zero.
    #[error("n_estimators must be at least 1, got {n_estimators}")]
    InvalidEstimatorCount {
        /// The invalid n_estimators value provided.
        n_estimators: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when min_impurity_decrease is negative or not finite.
    #[error("min_impurity_decrease must be finite and non-negative, got {value}")]
    InvalidMinImpurityDecrease {
        /// The invalid value provided.
        value: f64,
    },

    /// Returned when ccp_alpha is negative or not finite.
    #[error("ccp_alpha must be finite and non-negative, got {ccp_alpha}")]
    InvalidCcpAlpha {
        /// The invalid ccp_alpha value provided.
        ccp_alpha: f64,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the feature matrix and target vector differ in length.
    #[error("feature matrix has {n_samples} rows but target vector has {n_targets} values")]
    TargetLengthMismatch {
        /// Number of rows in the feature matrix.
        n_samples: usize,
        /// Number of target values.
        n_targets: usize,
    },

    /// Returned when a sample has a different number of features than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when declared feature types do not match the column count.
    #[error("{declared} feature types declared for {n_features} feature columns")]
    FeatureTypeCountMismatch {
        /// Number of declared feature types.
        declared: usize,
        /// Number of feature columns in the data.
        n_features: usize,
    },

    /// Returned when a regression target is NaN or infinite.
    #[error("non-finite target value at sample {sample_index}")]
    NonFiniteTarget {
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when predicting, serializing, or reading importances before `fit`.
    #[error("model is not fitted; call fit first")]
    NotFitted,

    /// Returned when a split node references a feature the sample does not have.
    #[error("split on feature {feature_index}, but sample has only {n_features} features")]
    FeatureIndexOutOfBounds {
        /// The feature index stored in the split node.
        feature_index: usize,
        /// The number of values in the sample.
        n_features: usize,
    },

    /// Returned when a node graph violates the tree invariants.
    #[error("malformed tree: {reason}")]
    MalformedTree {
        /// Human-readable description of the violated invariant.
        reason: String,
    },

    /// Returned when a persisted model has a different type tag than expected.
    #[error("model type mismatch: expected \"{expected}\", found \"{found}\"")]
    ModelTypeMismatch {
        /// The type tag this loader accepts.
        expected: String,
        /// The type tag found in the document.
        found: String,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model")]
    DeserializeModel {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a fitted model holds a number JSON cannot represent.
    #[error("cannot serialize non-finite {field} at node {node}")]
    NonFiniteModelValue {
        /// Preorder position of the offending node.
        node: usize,
        /// Which node field is not finite.
        field: &'static str,
    },

    /// Returned when metric inputs have different lengths.
    #[error("metric inputs differ in length: {n_true} true values, {n_pred} predictions")]
    MetricLengthMismatch {
        /// Number of ground-truth values.
        n_true: usize,
        /// Number of predicted values.
        n_pred: usize,
    },
}

impl TreeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TreeError::MalformedTree {
            reason: reason.into(),
        }
    }
}

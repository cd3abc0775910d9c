//! Validation of the sample matrix and conversion to typed columns.

use std::collections::HashMap;

use crate::error::TreeError;
use crate::value::{FeatureType, FeatureValue};

/// A feature column in column-major layout, restricted to the rows being fit.
#[derive(Debug, Clone)]
pub(crate) enum Column {
    /// Numbers; `None` is missing.
    Numeric(Vec<Option<f64>>),
    /// Category codes into `levels`; `None` is missing.
    Categorical {
        codes: Vec<Option<usize>>,
        levels: Vec<String>,
    },
}

/// A validated training matrix.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) n_samples: usize,
    pub(crate) n_features: usize,
    pub(crate) feature_types: Vec<FeatureType>,
    pub(crate) columns: Vec<Column>,
}

/// Validate `features` against the target length and declared types, then
/// build one typed column per feature.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`TreeError::EmptyDataset`] | `features` is empty |
/// | [`TreeError::TargetLengthMismatch`] | `features.len() != n_targets` |
/// | [`TreeError::FeatureCountMismatch`] | rows have inconsistent lengths |
/// | [`TreeError::FeatureTypeCountMismatch`] | declared types do not cover every column |
pub(crate) fn prepare(
    features: &[Vec<FeatureValue>],
    n_targets: usize,
    declared: Option<&[FeatureType]>,
) -> Result<Prepared, TreeError> {
    if features.is_empty() {
        return Err(TreeError::EmptyDataset);
    }
    if features.len() != n_targets {
        return Err(TreeError::TargetLengthMismatch {
            n_samples: features.len(),
            n_targets,
        });
    }
    let n_features = features[0].len();
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(TreeError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
    }

    let feature_types = match declared {
        Some(types) if types.len() != n_features => {
            return Err(TreeError::FeatureTypeCountMismatch {
                declared: types.len(),
                n_features,
            });
        }
        Some(types) => types.to_vec(),
        None => (0..n_features).map(|f| infer_type(features, f)).collect(),
    };

    let columns = feature_types
        .iter()
        .enumerate()
        .map(|(f, &ty)| build_column(features, f, ty))
        .collect();

    Ok(Prepared {
        n_samples: features.len(),
        n_features,
        feature_types,
        columns,
    })
}

/// Type of column `feature` judged by its first present value.
fn infer_type(features: &[Vec<FeatureValue>], feature: usize) -> FeatureType {
    features
        .iter()
        .map(|row| &row[feature])
        .find(|v| !v.is_missing())
        .map_or(FeatureType::Numerical, |v| match v {
            FeatureValue::Category(_) => FeatureType::Categorical,
            _ => FeatureType::Numerical,
        })
}

fn build_column(features: &[Vec<FeatureValue>], feature: usize, ty: FeatureType) -> Column {
    match ty {
        FeatureType::Numerical => Column::Numeric(
            features
                .iter()
                .map(|row| row[feature].as_number())
                .collect(),
        ),
        FeatureType::Categorical => {
            let mut levels: Vec<String> = Vec::new();
            let mut lookup: HashMap<String, usize> = HashMap::new();
            let codes = features
                .iter()
                .map(|row| {
                    row[feature].as_category().map(|token| {
                        if let Some(&code) = lookup.get(token.as_ref()) {
                            return code;
                        }
                        let code = levels.len();
                        levels.push(token.to_string());
                        lookup.insert(token.into_owned(), code);
                        code
                    })
                })
                .collect();
            Column::Categorical { codes, levels }
        }
    }
}

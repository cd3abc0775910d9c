//! Feature cells, column types, and class labels.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell of the sample matrix.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// A numeric value. `NaN` and infinities are read as missing.
    Numeric(f64),
    /// A categorical token.
    Category(String),
    /// No value recorded.
    Missing,
}

impl FeatureValue {
    /// Return `true` for [`FeatureValue::Missing`] and non-finite numbers.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            FeatureValue::Missing => true,
            FeatureValue::Numeric(v) => !v.is_finite(),
            FeatureValue::Category(_) => false,
        }
    }

    /// Read the cell as a number.
    ///
    /// Category tokens that parse as a finite float are accepted; anything
    /// else (including missing cells and infinities) yields `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) if v.is_finite() => Some(*v),
            FeatureValue::Category(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Read the cell as a category token.
    ///
    /// Numbers use their display form, so `2.0` becomes `"2"`.
    #[must_use]
    pub fn as_category(&self) -> Option<Cow<'_, str>> {
        match self {
            FeatureValue::Category(s) => Some(Cow::Borrowed(s.as_str())),
            FeatureValue::Numeric(v) if v.is_finite() => Some(Cow::Owned(v.to_string())),
            _ => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Numeric(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Category(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Category(value)
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FeatureValue::Missing, FeatureValue::Numeric)
    }
}

/// Build an all-numeric sample matrix from row-major floats.
#[must_use]
pub fn numeric_matrix(rows: &[Vec<f64>]) -> Vec<Vec<FeatureValue>> {
    rows.iter()
        .map(|row| row.iter().map(|&v| FeatureValue::Numeric(v)).collect())
        .collect()
}

/// Declared type of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// Split by threshold on the numeric value.
    Numerical,
    /// Split by membership in a subset of categories.
    Categorical,
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureType::Numerical => write!(f, "numerical"),
            FeatureType::Categorical => write!(f, "categorical"),
        }
    }
}

/// A classification target.
///
/// Labels compare by equality of their payload. The total order used for
/// the sorted class list puts numbers (by value) before text (lexicographic).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Label {
    /// A numeric class label such as `0` or `1`.
    Number(f64),
    /// A string class label such as `"setosa"`.
    Text(String),
}

impl Label {
    /// Parse a raw token: numbers become [`Label::Number`], the rest [`Label::Text`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Label::Number(v),
            _ => Label::Text(raw.to_string()),
        }
    }

    // -0.0 and 0.0 must hash and compare alike.
    fn number_bits(v: f64) -> u64 {
        if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Label::Number(v) => {
                0u8.hash(state);
                Self::number_bits(*v).hash(state);
            }
            Label::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Label::Number(a), Label::Number(b)) => {
                f64::from_bits(Self::number_bits(*a)).total_cmp(&f64::from_bits(Self::number_bits(*b)))
            }
            (Label::Number(_), Label::Text(_)) => Ordering::Less,
            (Label::Text(_), Label::Number(_)) => Ordering::Greater,
            (Label::Text(a), Label::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Number(v) => write!(f, "{v}"),
            Label::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Text(value)
    }
}

impl From<f64> for Label {
    fn from(value: f64) -> Self {
        Label::Number(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Label::Number(f64::from(value))
    }
}

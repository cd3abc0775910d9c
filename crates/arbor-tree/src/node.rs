use std::collections::BTreeSet;
use std::fmt;

use crate::value::FeatureValue;

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion-agnostic impurity value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// How a split node routes a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// Numeric rule: values `<= threshold` go left.
    Threshold(f64),
    /// Categorical rule: tokens in the set go left.
    Categories(BTreeSet<String>),
}

impl SplitRule {
    /// Decide the direction for a present value.
    ///
    /// Returns `None` when the value is missing or, for a threshold rule,
    /// cannot be read as a number; the caller applies the missing-value
    /// policy in that case.
    #[must_use]
    pub fn goes_left(&self, value: &FeatureValue) -> Option<bool> {
        match self {
            SplitRule::Threshold(threshold) => value.as_number().map(|v| v <= *threshold),
            SplitRule::Categories(left) => value.as_category().map(|c| left.contains(c.as_ref())),
        }
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node<V>>` where children are referenced by
/// [`NodeIndex`]. Every node carries the value it predicts as a leaf, so a
/// split node can be collapsed by pruning without recomputation.
#[derive(Debug, Clone)]
pub enum Node<V> {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Routing rule on that feature.
        rule: SplitRule,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Impurity at this node before splitting.
        impurity: Impurity,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Prediction if this node were a leaf.
        value: V,
    },
    /// A terminal leaf node.
    Leaf {
        /// Prediction payload.
        value: V,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl<V> Node<V> {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return the payload: the prediction for a leaf, the collapsed value for a split.
    #[must_use]
    pub fn value(&self) -> &V {
        match self {
            Node::Split { value, .. } | Node::Leaf { value, .. } => value,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

impl<V: Clone> Node<V> {
    /// Replace a split with a leaf carrying its cached value.
    pub(crate) fn collapse(&mut self) {
        if let Node::Split {
            impurity,
            n_samples,
            value,
            ..
        } = self
        {
            *self = Node::Leaf {
                value: value.clone(),
                impurity: *impurity,
                n_samples: *n_samples,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_leaf() -> Node<f64> {
        Node::Leaf {
            value: 3.5,
            impurity: Impurity::new(0.32),
            n_samples: 10,
        }
    }

    fn make_split() -> Node<f64> {
        Node::Split {
            feature: FeatureIndex::new(2),
            rule: SplitRule::Threshold(3.5),
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.48),
            n_samples: 20,
            value: 7.0,
        }
    }

    #[test]
    fn feature_index_display() {
        assert_eq!(format!("{}", FeatureIndex::new(3)), "3");
    }

    #[test]
    fn node_index_ordering() {
        assert!(NodeIndex::new(10) < NodeIndex::new(20));
    }

    #[test]
    fn impurity_display() {
        assert_eq!(format!("{}", Impurity::new(0.333333)), "0.333333");
    }

    #[test]
    fn leaf_accessors() {
        let leaf = make_leaf();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.n_samples(), 10);
        assert_eq!(*leaf.value(), 3.5);
    }

    #[test]
    fn split_accessors() {
        let split = make_split();
        assert!(!split.is_leaf());
        assert_eq!(split.n_samples(), 20);
        assert!((split.impurity().value() - 0.48).abs() < f64::EPSILON);
    }

    #[test]
    fn collapse_keeps_cached_value() {
        let mut node = make_split();
        node.collapse();
        assert!(node.is_leaf());
        assert_eq!(*node.value(), 7.0);
        assert_eq!(node.n_samples(), 20);
    }

    #[test]
    fn threshold_rule_routing() {
        let rule = SplitRule::Threshold(2.0);
        assert_eq!(rule.goes_left(&FeatureValue::Numeric(2.0)), Some(true));
        assert_eq!(rule.goes_left(&FeatureValue::Numeric(2.5)), Some(false));
        assert_eq!(rule.goes_left(&FeatureValue::from("1")), Some(true));
        assert_eq!(rule.goes_left(&FeatureValue::from("abc")), None);
        assert_eq!(rule.goes_left(&FeatureValue::Missing), None);
    }

    #[test]
    fn category_rule_routing() {
        let rule = SplitRule::Categories(["A".to_string(), "3".to_string()].into_iter().collect());
        assert_eq!(rule.goes_left(&FeatureValue::from("A")), Some(true));
        assert_eq!(rule.goes_left(&FeatureValue::from("B")), Some(false));
        assert_eq!(rule.goes_left(&FeatureValue::Numeric(3.0)), Some(true));
        assert_eq!(rule.goes_left(&FeatureValue::Missing), None);
    }
}

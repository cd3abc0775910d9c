//! Feature importance aggregation and ranking.

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score.
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Element-wise mean of per-tree importance vectors of length `n_features`.
pub(crate) fn mean_importances(per_tree: &[Vec<f64>], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0f64; n_features];
    if per_tree.is_empty() {
        return totals;
    }
    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }
    let n = per_tree.len() as f64;
    totals.iter_mut().for_each(|v| *v /= n);
    totals
}

/// Pair importances with column names, sort descending, and assign 1-based
/// ranks. Ties keep column order. Columns without a name are called `f{index}`.
#[must_use]
pub fn rank_importances(importances: &[f64], names: &[String]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = importances
        .iter()
        .enumerate()
        .map(|(i, &importance)| RankedFeature {
            name: names.get(i).cloned().unwrap_or_else(|| format!("f{i}")),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_normalized_vectors_sums_to_one() {
        let per_tree = vec![vec![1.0, 0.0, 0.0], vec![0.25, 0.25, 0.5]];
        let mean = mean_importances(&per_tree, 3);
        assert_eq!(mean, vec![0.625, 0.125, 0.25]);
        assert!((mean.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(mean_importances(&[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn ranks_descending() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_importances(&[0.2, 0.5, 0.3], &names);
        let order: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ties_keep_column_order_and_names_default() {
        let ranked = rank_importances(&[0.5, 0.5], &[]);
        assert_eq!(ranked[0].name, "f0");
        assert_eq!(ranked[1].name, "f1");
    }
}

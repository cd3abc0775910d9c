use std::collections::BTreeSet;

use rand::Rng;

use crate::matrix::Column;
use crate::node::{FeatureIndex, SplitRule};
use crate::outcome::Outcome;

/// Size constraints applied while searching for a split.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitParams {
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Routing rule on that feature.
    pub(crate) rule: SplitRule,
    /// Impurity decrease over the non-missing samples of the feature.
    pub(crate) gain: f64,
    /// Sample indices going to the left child, missing values included.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child, missing values included.
    pub(crate) right_indices: Vec<usize>,
}

/// Winning rule in search-internal form.
#[derive(Debug, Clone)]
enum Candidate {
    Threshold(f64),
    /// Category codes sent left.
    Codes(Vec<usize>),
}

/// Find the best split among a random subset of features.
///
/// Candidate features are drawn by a partial Fisher-Yates shuffle and then
/// visited in ascending order, so ties resolve to the lowest feature index
/// and, within a feature, the first threshold or category prefix found.
/// Samples whose value is missing for a feature take no part in scoring it;
/// once a winner is chosen they join the side holding more non-missing
/// samples (the left side on a tie).
///
/// Returns `None` when no feature admits a split that respects
/// `min_samples_split` (on non-missing samples) and `min_samples_leaf`.
pub(crate) fn find_best_split<O: Outcome>(
    columns: &[Column],
    outcome: &O,
    sample_indices: &[usize],
    params: &SplitParams,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = columns.len();
    if sample_indices.is_empty() || n_features == 0 {
        return None;
    }

    let mut best_gain = f64::NEG_INFINITY;
    let mut best: Option<(usize, Candidate)> = None;

    for feat_idx in select_features(n_features, params.max_features, rng) {
        let found = match &columns[feat_idx] {
            Column::Numeric(values) => best_threshold(values, outcome, sample_indices, params),
            Column::Categorical { codes, .. } => {
                best_category_prefix(codes, outcome, sample_indices, params)
            }
        };
        if let Some((gain, candidate)) = found
            && gain > best_gain
        {
            best_gain = gain;
            best = Some((feat_idx, candidate));
        }
    }

    let (feat_idx, candidate) = best?;
    let column = &columns[feat_idx];

    let mut left_indices = Vec::with_capacity(sample_indices.len() / 2);
    let mut right_indices = Vec::with_capacity(sample_indices.len() / 2);
    let mut missing = Vec::new();
    let left_codes: Vec<bool> = match (&candidate, column) {
        (Candidate::Codes(sent_left), Column::Categorical { levels, .. }) => {
            let mut mask = vec![false; levels.len()];
            sent_left.iter().for_each(|&c| mask[c] = true);
            mask
        }
        _ => Vec::new(),
    };
    for &si in sample_indices {
        let goes_left = match (column, &candidate) {
            (Column::Numeric(values), Candidate::Threshold(t)) => values[si].map(|v| v <= *t),
            (Column::Categorical { codes, .. }, Candidate::Codes(_)) => {
                codes[si].map(|c| left_codes[c])
            }
            _ => None,
        };
        match goes_left {
            Some(true) => left_indices.push(si),
            Some(false) => right_indices.push(si),
            None => missing.push(si),
        }
    }

    // Missing values follow the larger non-missing side; ties and empty sides go left.
    if !left_indices.is_empty() && right_indices.len() > left_indices.len() {
        right_indices.extend(missing);
    } else {
        left_indices.extend(missing);
    }

    let rule = match (candidate, column) {
        (Candidate::Threshold(t), _) => SplitRule::Threshold(t),
        (Candidate::Codes(sent_left), Column::Categorical { levels, .. }) => SplitRule::Categories(
            sent_left
                .into_iter()
                .map(|c| levels[c].clone())
                .collect::<BTreeSet<String>>(),
        ),
        (Candidate::Codes(_), Column::Numeric(_)) => return None,
    };

    Some(SplitResult {
        feature: FeatureIndex::new(feat_idx),
        rule,
        gain: best_gain,
        left_indices,
        right_indices,
    })
}

/// Pick `max_features` distinct columns uniformly and return them sorted.
fn select_features(n_features: usize, max_features: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.clamp(1, n_features);
    if take < n_features {
        // Partial Fisher-Yates: shuffle only the first `take` positions.
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }
        feature_order.truncate(take);
        feature_order.sort_unstable();
    }
    feature_order
}

/// Weighted impurity decrease of a two-way partition against `baseline`.
fn split_gain<O: Outcome>(outcome: &O, baseline: f64, left: &O::Stats, right: &O::Stats) -> f64 {
    let n_left = outcome.count(left) as f64;
    let n_right = outcome.count(right) as f64;
    let n = n_left + n_right;
    baseline
        - (n_left / n) * outcome.impurity(left)
        - (n_right / n) * outcome.impurity(right)
}

/// Scan midpoints between consecutive distinct values.
fn best_threshold<O: Outcome>(
    values: &[Option<f64>],
    outcome: &O,
    sample_indices: &[usize],
    params: &SplitParams,
) -> Option<(f64, Candidate)> {
    let mut sorted: Vec<(f64, usize)> = sample_indices
        .iter()
        .filter_map(|&si| values[si].map(|v| (v, si)))
        .collect();
    let n_present = sorted.len();
    if n_present < params.min_samples_split || n_present < 2 {
        return None;
    }
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut right = outcome.empty_stats();
    for &(_, si) in &sorted {
        outcome.add(&mut right, si);
    }
    let baseline = outcome.impurity(&right);
    let mut left = outcome.empty_stats();

    let mut best: Option<(f64, Candidate)> = None;
    for i in 0..(n_present - 1) {
        let (val_i, si) = sorted[i];
        outcome.add(&mut left, si);
        outcome.remove(&mut right, si);

        let val_next = sorted[i + 1].0;
        if val_i == val_next {
            continue;
        }
        let n_left = i + 1;
        let n_right = n_present - n_left;
        if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
            continue;
        }

        let gain = split_gain(outcome, baseline, &left, &right);
        if best.as_ref().is_none_or(|(g, _)| gain > *g) {
            // Halve first so values near the f64 range limits cannot overflow.
            let mid = val_i / 2.0 + val_next / 2.0;
            // Adjacent floats can round the midpoint up onto the right value.
            let threshold = if mid < val_next { mid } else { val_i };
            best = Some((gain, Candidate::Threshold(threshold)));
        }
    }
    best
}

/// Evaluate category subsets as prefixes of a one-dimensional ranking.
///
/// With two categories the only candidate isolates the first one seen. With
/// more, categories are ordered by the outcome's score (first-label
/// probability or mean target) and the k-1 prefixes of that order are tried,
/// which avoids enumerating all 2^(k-1)-1 subsets.
fn best_category_prefix<O: Outcome>(
    codes: &[Option<usize>],
    outcome: &O,
    sample_indices: &[usize],
    params: &SplitParams,
) -> Option<(f64, Candidate)> {
    // Per-category sample lists in first-seen order.
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut n_present = 0usize;
    for &si in sample_indices {
        let Some(code) = codes[si] else { continue };
        n_present += 1;
        match groups.iter_mut().find(|(c, _)| *c == code) {
            Some((_, members)) => members.push(si),
            None => groups.push((code, vec![si])),
        }
    }
    if n_present < params.min_samples_split || groups.len() < 2 {
        return None;
    }

    if groups.len() > 2 {
        let mut scored: Vec<(f64, (usize, Vec<usize>))> = groups
            .into_iter()
            .map(|group| (outcome.category_score(&outcome.stats_of(&group.1)), group))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        groups = scored.into_iter().map(|(_, group)| group).collect();
    }

    let mut right = outcome.empty_stats();
    for (_, members) in &groups {
        for &si in members {
            outcome.add(&mut right, si);
        }
    }
    let baseline = outcome.impurity(&right);
    let mut left = outcome.empty_stats();

    let mut best: Option<(f64, usize)> = None;
    for (prefix_len, (_, members)) in groups.iter().enumerate().take(groups.len() - 1) {
        for &si in members {
            outcome.add(&mut left, si);
            outcome.remove(&mut right, si);
        }
        let n_left = outcome.count(&left);
        let n_right = outcome.count(&right);
        if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
            continue;
        }
        let gain = split_gain(outcome, baseline, &left, &right);
        if best.is_none_or(|(g, _)| gain > g) {
            best = Some((gain, prefix_len + 1));
        }
    }

    best.map(|(gain, len)| {
        let sent_left = groups[..len].iter().map(|(code, _)| *code).collect();
        (gain, Candidate::Codes(sent_left))
    })
}

//! Behavioral regression tests for arbor-tree.
//!
//! These pin the observable contract of the estimators on small
//! deterministic datasets: split placement, missing-value routing,
//! pruning, importances, persistence and forest reproducibility.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_tree::metrics::{accuracy, r2_score};
use arbor_tree::{
    DecisionTreeClassifier, DecisionTreeRegressor, FeatureType, FeatureValue, ForestConfig, Label,
    Node, RandomForestClassifier, RandomForestRegressor, SplitRule, TreeConfig, numeric_matrix,
};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic datasets
// ---------------------------------------------------------------------------

/// 300 samples, 6 features, 3 classes.
///
/// Features 0-1 are informative (class * 3.0 + noise in [0, 0.5]), feature 2
/// is a categorical echo of the class with 10% of cells missing, features
/// 3-5 are noise in [0, 0.5].
fn make_classification() -> (Vec<Vec<FeatureValue>>, Vec<Label>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let names = ["setosa", "versicolor", "virginica"];
    let mut rows = Vec::with_capacity(300);
    let mut labels = Vec::with_capacity(300);
    for i in 0..300 {
        let class = i % 3;
        labels.push(Label::from(names[class]));
        let mut row: Vec<FeatureValue> = (0..6)
            .map(|f| {
                let base = if f < 2 { class as f64 * 3.0 } else { 0.0 };
                FeatureValue::Numeric(base + rng.r#gen::<f64>() * 0.5)
            })
            .collect();
        row[2] = if rng.r#gen::<f64>() < 0.1 {
            FeatureValue::Missing
        } else {
            FeatureValue::from(format!("c{class}"))
        };
        rows.push(row);
    }
    (rows, labels)
}

/// 200 samples of y = 3·x0 − 2·x1 + noise, with x2 pure noise.
fn make_regression() -> (Vec<Vec<FeatureValue>>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut rows = Vec::with_capacity(200);
    let mut targets = Vec::with_capacity(200);
    for _ in 0..200 {
        let x: [f64; 3] = [rng.r#gen(), rng.r#gen(), rng.r#gen()];
        targets.push(3.0 * x[0] - 2.0 * x[1] + rng.r#gen::<f64>() * 0.05);
        rows.push(x.to_vec());
    }
    (numeric_matrix(&rows), targets)
}

fn labels(raw: &[&str]) -> Vec<Label> {
    raw.iter().map(|&s| Label::from(s)).collect()
}

// ---------------------------------------------------------------------------
// Single trees
// ---------------------------------------------------------------------------

#[test]
fn threshold_split_scenario() {
    let x = numeric_matrix(&[
        vec![10.0],
        vec![12.0],
        vec![15.0],
        vec![18.0],
        vec![20.0],
        vec![22.0],
    ]);
    let y = labels(&["A", "A", "A", "B", "B", "B"]);
    let mut clf = DecisionTreeClassifier::new(TreeConfig::new().with_max_depth(Some(2)));
    clf.fit(&x, &y).unwrap();

    let pred = clf.predict(&numeric_matrix(&[vec![9.0], vec![21.0]])).unwrap();
    assert_eq!(pred, labels(&["A", "B"]));
    match &clf.nodes().unwrap()[0] {
        Node::Split { rule, .. } => assert_eq!(*rule, SplitRule::Threshold(16.5)),
        Node::Leaf { .. } => panic!("root should split"),
    }
}

#[test]
fn regression_predictions_monotone() {
    let x = numeric_matrix(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]]);
    let y = [10.0, 20.0, 30.0, 40.0, 50.0];
    let mut reg = DecisionTreeRegressor::default();
    reg.fit(&x, &y).unwrap();

    let mid = reg.predict_one(&[FeatureValue::Numeric(2.5)]).unwrap();
    assert!(mid > 10.0 && mid < 40.0, "predict(2.5) = {mid}");
    let low = reg.predict_one(&[FeatureValue::Numeric(1.0)]).unwrap();
    let high = reg.predict_one(&[FeatureValue::Numeric(5.0)]).unwrap();
    assert!(low < high);
}

#[test]
fn categorical_feature_perfect_split() {
    let x = vec![
        vec![FeatureValue::from("A")],
        vec![FeatureValue::from("B")],
        vec![FeatureValue::from("A")],
        vec![FeatureValue::from("B")],
    ];
    let y = vec![Label::from(0), Label::from(1), Label::from(0), Label::from(1)];
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &y).unwrap();

    let nodes = clf.nodes().unwrap();
    assert_eq!(nodes.len(), 3);
    let (left, right) = match &nodes[0] {
        Node::Split {
            rule: SplitRule::Categories(set),
            left,
            right,
            ..
        } => {
            assert_eq!(set.iter().collect::<Vec<_>>(), vec!["A"]);
            (left.index(), right.index())
        }
        other => panic!("expected categorical split, got {other:?}"),
    };
    for child in [left, right] {
        assert!(nodes[child].is_leaf());
        assert_eq!(nodes[child].impurity().value(), 0.0);
    }
    assert_eq!(clf.feature_types().unwrap(), &[FeatureType::Categorical]);
    assert_eq!(clf.predict(&x).unwrap(), y);
}

#[test]
fn missing_value_routes_to_larger_child() {
    // x <= 2.5 holds 2 samples, the right side 3.
    let x = numeric_matrix(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]]);
    let y = labels(&["lo", "lo", "hi", "hi", "hi"]);
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &y).unwrap();
    assert_eq!(clf.predict_one(&[FeatureValue::Missing]).unwrap(), Label::from("hi"));
    assert_eq!(
        clf.predict_one(&[FeatureValue::Numeric(f64::NAN)]).unwrap(),
        Label::from("hi")
    );
}

#[test]
fn missing_value_tie_routes_left() {
    let x = numeric_matrix(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
    let y = labels(&["lo", "lo", "hi", "hi"]);
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &y).unwrap();
    assert_eq!(clf.predict_one(&[FeatureValue::Missing]).unwrap(), Label::from("lo"));
}

#[test]
fn training_missing_values_join_larger_side() {
    // Non-missing: 2 left (x <= 2.5), 3 right. The missing row joins the right.
    let x = vec![
        vec![FeatureValue::Numeric(1.0)],
        vec![FeatureValue::Numeric(2.0)],
        vec![FeatureValue::Numeric(3.0)],
        vec![FeatureValue::Numeric(4.0)],
        vec![FeatureValue::Numeric(5.0)],
        vec![FeatureValue::Missing],
    ];
    let y = labels(&["lo", "lo", "hi", "hi", "hi", "hi"]);
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &y).unwrap();
    let nodes = clf.nodes().unwrap();
    let Node::Split { left, right, .. } = &nodes[0] else {
        panic!("root should split");
    };
    assert_eq!(nodes[left.index()].n_samples(), 2);
    assert_eq!(nodes[right.index()].n_samples(), 4);
}

#[test]
fn pure_leaf_has_zero_importances() {
    let x = numeric_matrix(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &labels(&["same", "same"])).unwrap();
    assert_eq!(clf.n_nodes(), 1);
    assert_eq!(clf.feature_importances().unwrap(), vec![0.0, 0.0]);
}

#[test]
fn importances_sum_to_one_and_rank_informative_features() {
    let (x, y) = make_classification();
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &y).unwrap();
    let imp = clf.feature_importances().unwrap();
    assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    let informative = imp[0] + imp[1] + imp[2];
    assert!(informative > 0.9, "informative share {informative}");
}

#[test]
fn increasing_ccp_alpha_never_adds_leaves() {
    let (x, y) = make_regression();
    let mut previous = usize::MAX;
    for alpha in [0.0, 1e-4, 1e-3, 1e-2, 0.05, 0.1, 1.0, 100.0] {
        let mut reg = DecisionTreeRegressor::new(TreeConfig::new().with_ccp_alpha(alpha));
        reg.fit(&x, &y).unwrap();
        let leaves = reg.n_leaves();
        assert!(leaves <= previous, "alpha {alpha}: {leaves} leaves after {previous}");
        previous = leaves;
    }
    assert_eq!(previous, 1, "a huge alpha collapses to the root");
}

#[test]
fn pruned_tree_nodes_are_compact() {
    let (x, y) = make_regression();
    let mut reg = DecisionTreeRegressor::new(TreeConfig::new().with_ccp_alpha(0.01));
    reg.fit(&x, &y).unwrap();
    assert_eq!(reg.n_nodes(), 2 * reg.n_leaves() - 1);
}

#[test]
fn regression_tree_fits_linear_signal() {
    let (x, y) = make_regression();
    let mut reg = DecisionTreeRegressor::new(TreeConfig::new().with_max_depth(Some(8)));
    reg.fit(&x, &y).unwrap();
    let r2 = r2_score(&y, &reg.predict(&x).unwrap()).unwrap();
    assert!(r2 > 0.95, "training r2 {r2}");
}

#[test]
fn declared_feature_types_must_cover_columns() {
    let x = numeric_matrix(&[vec![1.0, 2.0]]);
    let mut clf = DecisionTreeClassifier::new(
        TreeConfig::new().with_feature_types(Some(vec![FeatureType::Numerical])),
    );
    let err = clf.fit(&x, &labels(&["a"])).unwrap_err();
    assert!(matches!(
        err,
        arbor_tree::TreeError::FeatureTypeCountMismatch { declared: 1, n_features: 2 }
    ));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn json_round_trip_is_bit_identical() {
    let (x, y) = make_classification();
    let mut clf = DecisionTreeClassifier::new(TreeConfig::new().with_ccp_alpha(0.005));
    clf.fit(&x, &y).unwrap();
    let restored = DecisionTreeClassifier::from_json(&clf.to_json().unwrap()).unwrap();
    assert_eq!(clf.predict(&x).unwrap(), restored.predict(&x).unwrap());
    let a = clf.predict_proba(&x).unwrap();
    let b = restored.predict_proba(&x).unwrap();
    for (ra, rb) in a.iter().zip(&b) {
        for (pa, pb) in ra.iter().zip(rb) {
            assert_eq!(pa.to_bits(), pb.to_bits());
        }
    }

    let (xr, yr) = make_regression();
    let mut reg = DecisionTreeRegressor::default();
    reg.fit(&xr, &yr).unwrap();
    let restored = DecisionTreeRegressor::from_json(&reg.to_json().unwrap()).unwrap();
    for (pa, pb) in reg.predict(&xr).unwrap().iter().zip(restored.predict(&xr).unwrap()) {
        assert_eq!(pa.to_bits(), pb.to_bits());
    }
}

#[test]
fn regression_split_survives_large_target_offset() {
    let x = numeric_matrix(&[
        vec![1.0],
        vec![2.0],
        vec![3.0],
        vec![4.0],
        vec![5.0],
        vec![6.0],
    ]);
    let y: Vec<f64> = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]
        .iter()
        .map(|d| 1e9 + d)
        .collect();
    let mut reg = DecisionTreeRegressor::new(TreeConfig::new().with_max_depth(Some(1)));
    reg.fit(&x, &y).unwrap();

    let nodes = reg.nodes().unwrap();
    assert_eq!(nodes.len(), 3);
    match &nodes[0] {
        Node::Split { rule, .. } => assert_eq!(*rule, SplitRule::Threshold(3.5)),
        Node::Leaf { .. } => panic!("root should split"),
    }
    assert_eq!(reg.predict(&x).unwrap(), y);
}

#[test]
fn infinite_feature_cells_are_missing_and_persist() {
    let x = numeric_matrix(&[vec![f64::NEG_INFINITY], vec![1.0], vec![2.0], vec![3.0]]);
    let y = labels(&["a", "b", "b", "b"]);
    let mut clf = DecisionTreeClassifier::default();
    clf.fit(&x, &y).unwrap();
    for node in clf.nodes().unwrap() {
        if let Node::Split {
            rule: SplitRule::Threshold(t),
            ..
        } = node
        {
            assert!(t.is_finite());
        }
    }

    let json = clf.to_json().unwrap();
    assert!(!json.contains("\"threshold\":null"));
    let restored = DecisionTreeClassifier::from_json(&json).unwrap();
    assert_eq!(clf.predict(&x).unwrap(), restored.predict(&x).unwrap());
    assert_eq!(
        clf.predict(&[vec![FeatureValue::Numeric(f64::INFINITY)]]).unwrap(),
        clf.predict(&[vec![FeatureValue::Missing]]).unwrap()
    );
}

#[test]
fn regressor_json_round_trip_with_categories_and_missing() {
    let colors = ["red", "blue", "green"];
    let means = [1.0, 5.0, 9.0];
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..30 {
        let color = if i % 7 == 0 {
            FeatureValue::Missing
        } else {
            FeatureValue::from(colors[i % 3])
        };
        let size = if i % 5 == 0 {
            FeatureValue::Missing
        } else {
            FeatureValue::Numeric(i as f64)
        };
        x.push(vec![color, size]);
        y.push(means[i % 3] + i as f64 * 0.01);
    }
    let mut reg = DecisionTreeRegressor::default();
    reg.fit(&x, &y).unwrap();
    assert!(reg.nodes().unwrap().iter().any(|n| matches!(
        n,
        Node::Split {
            rule: SplitRule::Categories(_),
            ..
        }
    )));

    let restored = DecisionTreeRegressor::from_json(&reg.to_json().unwrap()).unwrap();
    let mut queries = x.clone();
    queries.push(vec![FeatureValue::from("purple"), FeatureValue::Missing]);
    queries.push(vec![FeatureValue::Missing, FeatureValue::Numeric(100.0)]);
    let a = reg.predict(&queries).unwrap();
    let b = restored.predict(&queries).unwrap();
    for (pa, pb) in a.iter().zip(&b) {
        assert_eq!(pa.to_bits(), pb.to_bits());
    }
    assert_eq!(restored.feature_types(), reg.feature_types());
}

// ---------------------------------------------------------------------------
// Forests
// ---------------------------------------------------------------------------

#[test]
fn forest_accuracy_above_threshold() {
    let (x, y) = make_classification();
    let (train_x, test_x) = x.split_at(240);
    let (train_y, test_y) = y.split_at(240);
    let mut rf = RandomForestClassifier::new(ForestConfig::new(30).unwrap().with_seed(42));
    rf.fit(train_x, train_y).unwrap();
    let acc = accuracy(test_y, &rf.predict(test_x).unwrap()).unwrap();
    assert!(acc > 0.9, "held-out accuracy {acc}");
}

#[test]
fn forest_is_deterministic_per_seed() {
    let (x, y) = make_classification();
    let fit = |seed| {
        let mut rf = RandomForestClassifier::new(ForestConfig::new(12).unwrap().with_seed(seed));
        rf.fit(&x, &y).unwrap();
        rf
    };
    let a = fit(5);
    let b = fit(5);
    assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn forest_importances_sum_to_one() {
    let (x, y) = make_regression();
    let mut rf = RandomForestRegressor::new(ForestConfig::new(10).unwrap());
    rf.fit(&x, &y).unwrap();
    let imp = rf.feature_importances().unwrap();
    assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(imp[0] > imp[2] && imp[1] > imp[2]);
}

#[test]
fn forest_proba_is_mean_of_members() {
    let (x, y) = make_classification();
    let mut rf = RandomForestClassifier::new(ForestConfig::new(4).unwrap().with_seed(1));
    rf.fit(&x, &y).unwrap();
    let sample = &x[0];
    let forest_proba = rf.predict_proba_one(sample).unwrap();
    let mut expected = vec![0.0; rf.classes().len()];
    for tree in rf.trees() {
        for (label, p) in tree.classes().iter().zip(tree.predict_proba_one(sample).unwrap()) {
            let pos = rf.classes().iter().position(|c| c == label).unwrap();
            expected[pos] += p / 4.0;
        }
    }
    for (a, b) in forest_proba.iter().zip(&expected) {
        assert!((a - b).abs() < 1e-12);
    }
}

//! Criterion benchmarks for arbor-tree: tree and forest training and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_tree::{
    DecisionTreeClassifier, FeatureValue, ForestConfig, Label, RandomForestClassifier,
    RandomForestRegressor, TreeConfig,
};

const CATEGORIES: [&str; 4] = ["red", "green", "blue", "grey"];

/// Mixed rows: three informative numeric columns, one categorical column,
/// and noise columns, with about 5% missing cells.
fn make_mixed(
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> (Vec<Vec<FeatureValue>>, Vec<Label>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    let mut targets = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(Label::from(format!("c{class}")));
        let row: Vec<FeatureValue> = (0..n_features)
            .map(|f| {
                if rng.r#gen::<f64>() < 0.05 {
                    return FeatureValue::Missing;
                }
                match f {
                    0..3 => FeatureValue::Numeric(class as f64 * 3.0 + rng.r#gen::<f64>() * 0.5),
                    3 => FeatureValue::from(CATEGORIES[class % CATEGORIES.len()]),
                    _ => FeatureValue::Numeric(rng.r#gen::<f64>()),
                }
            })
            .collect();
        targets.push(class as f64 * 10.0 + rng.r#gen::<f64>());
        features.push(row);
    }
    (features, labels, targets)
}

fn bench_forest_train(c: &mut Criterion) {
    let (features, labels, _) = make_mixed(500, 20, 5, 42);
    let config = ForestConfig::new(50).unwrap().with_seed(42);

    c.bench_function("forest_train_500x20_5class_50trees", |b| {
        b.iter(|| {
            let mut forest = RandomForestClassifier::new(config.clone());
            forest.fit(&features, &labels).unwrap();
            forest
        });
    });
}

fn bench_forest_predict(c: &mut Criterion) {
    let (features, labels, _) = make_mixed(500, 20, 5, 42);
    let mut forest = RandomForestClassifier::new(ForestConfig::new(50).unwrap().with_seed(42));
    forest.fit(&features, &labels).unwrap();

    c.bench_function("forest_predict_500x20_50trees", |b| {
        b.iter(|| forest.predict(&features).unwrap());
    });
}

fn bench_single_tree(c: &mut Criterion) {
    let (features, labels, _) = make_mixed(500, 20, 5, 42);

    c.bench_function("tree_train_500x20_5class", |b| {
        b.iter(|| {
            let mut tree = DecisionTreeClassifier::new(TreeConfig::new().with_seed(42));
            tree.fit(&features, &labels).unwrap();
            tree
        });
    });
}

fn bench_forest_regression(c: &mut Criterion) {
    let (features, _, targets) = make_mixed(500, 20, 5, 7);
    let config = ForestConfig::new(25).unwrap().with_seed(7);

    c.bench_function("forest_regress_500x20_25trees", |b| {
        b.iter(|| {
            let mut forest = RandomForestRegressor::new(config.clone());
            forest.fit(&features, &targets).unwrap();
            forest
        });
    });
}

criterion_group!(
    benches,
    bench_forest_train,
    bench_forest_predict,
    bench_single_tree,
    bench_forest_regression
);
criterion_main!(benches);

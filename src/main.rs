use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use arbor_io::{Dataset, DatasetReader, PredictionWriter};
use arbor_tree::metrics::{accuracy, mean_absolute_error, mean_squared_error, r2_score};
use arbor_tree::{
    ClassMetrics, ConfusionMatrix, Criterion, DecisionTreeClassifier, DecisionTreeRegressor,
    FeatureValue, ForestConfig, Label, MaxFeatures, RandomForestClassifier, RandomForestRegressor,
    RankedFeature, TreeConfig, rank_importances,
};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Train, apply, and score decision trees and random forests on CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for forest training and prediction (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Task {
    Classification,
    Regression,
}

/// Tree growth and pruning parameters.
#[derive(Args, Debug, Clone)]
struct TreeArgs {
    /// Impurity criterion: "gini" or "entropy" (classification), "mse" or "mae" (regression)
    #[arg(long)]
    criterion: Option<String>,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples a node needs before it may split
    #[arg(long, default_value_t = 2)]
    min_samples_split: usize,

    /// Minimum samples on each side of a split
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Minimum weighted impurity decrease for a split to be kept
    #[arg(long, default_value_t = 0.0)]
    min_impurity_decrease: f64,

    /// Features tried per split: "all", "sqrt", "log2", a count, or a fraction in (0, 1]
    #[arg(long)]
    max_features: Option<String>,

    /// Cost-complexity pruning strength (0 = no pruning)
    #[arg(long, default_value_t = 0.0)]
    ccp_alpha: f64,
}

/// Inputs and model shape for `train`.
#[derive(Args, Debug, Clone)]
struct TrainArgs {
    /// Path to the training CSV file
    #[arg(long)]
    data: PathBuf,

    /// Target column name (defaults to the last column)
    #[arg(long)]
    target: Option<String>,

    /// Learning task
    #[arg(long, value_enum, default_value_t = Task::Classification)]
    task: Task,

    /// Where to write the fitted model
    #[arg(long)]
    output: PathBuf,

    /// Train a random forest with this many trees instead of a single tree
    #[arg(long)]
    trees: Option<usize>,

    /// Train forest members on the full sample instead of bootstrap draws
    #[arg(long, default_value_t = false)]
    no_bootstrap: bool,

    #[command(flatten)]
    tree: TreeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Fit a tree or forest on a labelled CSV and save it as JSON
    Train(TrainArgs),

    /// Apply a saved model to a CSV file and write predictions as JSON
    Predict {
        /// Path to the saved model
        #[arg(long)]
        model: PathBuf,

        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Column to drop before predicting (all columns are features if not set)
        #[arg(long)]
        target: Option<String>,

        /// Output file (standard output if not set)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Include class probabilities (classifiers only)
        #[arg(long, default_value_t = false)]
        proba: bool,
    },

    /// Score a saved model against a labelled CSV file
    Evaluate {
        /// Path to the saved model
        #[arg(long)]
        model: PathBuf,

        /// Path to the labelled CSV file
        #[arg(long)]
        data: PathBuf,

        /// Target column name (defaults to the last column)
        #[arg(long)]
        target: Option<String>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainOutput {
    model_type: &'static str,
    model_path: String,
    n_samples: usize,
    n_features: usize,
    n_trees: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    training_score: f64,
    feature_importances: Vec<RankedFeature>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationScore {
    model_type: &'static str,
    n_samples: usize,
    accuracy: f64,
    labels: Vec<Label>,
    confusion_matrix: Vec<Vec<usize>>,
    class_metrics: Vec<ClassMetrics>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegressionScore {
    model_type: &'static str,
    n_samples: usize,
    mean_squared_error: f64,
    mean_absolute_error: f64,
    r2: f64,
}

/// Any model the CLI can train or load.
enum Model {
    Tree(DecisionTreeClassifier),
    TreeRegressor(DecisionTreeRegressor),
    Forest(RandomForestClassifier),
    ForestRegressor(RandomForestRegressor),
}

/// Predictions in the shape of the model that produced them.
enum Predictions {
    Labels {
        predicted: Vec<Label>,
        classes: Vec<Label>,
    },
    Values(Vec<f64>),
}

impl Model {
    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read model {}", path.display()))?;
        let tag = arbor_tree::model_type(&json).context("model file has no type tag")?;
        let model = match tag.as_str() {
            "classifier" => Model::Tree(DecisionTreeClassifier::from_json(&json)?),
            "regressor" => Model::TreeRegressor(DecisionTreeRegressor::from_json(&json)?),
            "randomForestClassifier" => Model::Forest(RandomForestClassifier::from_json(&json)?),
            "randomForestRegressor" => {
                Model::ForestRegressor(RandomForestRegressor::from_json(&json)?)
            }
            other => bail!("unknown model type \"{other}\" in {}", path.display()),
        };
        info!(
            model_type = model.type_tag(),
            n_features = model.n_features(),
            "model loaded"
        );
        Ok(model)
    }

    fn type_tag(&self) -> &'static str {
        match self {
            Model::Tree(_) => "classifier",
            Model::TreeRegressor(_) => "regressor",
            Model::Forest(_) => "randomForestClassifier",
            Model::ForestRegressor(_) => "randomForestRegressor",
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        match self {
            Model::Tree(m) => m.save(path)?,
            Model::TreeRegressor(m) => m.save(path)?,
            Model::Forest(m) => m.save(path)?,
            Model::ForestRegressor(m) => m.save(path)?,
        }
        Ok(())
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            Model::Tree(m) => m.n_features(),
            Model::TreeRegressor(m) => m.n_features(),
            Model::Forest(m) => m.n_features(),
            Model::ForestRegressor(m) => m.n_features(),
        }
    }

    fn n_trees(&self) -> usize {
        match self {
            Model::Tree(_) | Model::TreeRegressor(_) => 1,
            Model::Forest(m) => m.trees().len(),
            Model::ForestRegressor(m) => m.trees().len(),
        }
    }

    /// Node count, leaf count, and depth; summed and maxed over forest members.
    fn shape(&self) -> (usize, usize, usize) {
        match self {
            Model::Tree(m) => (m.n_nodes(), m.n_leaves(), m.depth()),
            Model::TreeRegressor(m) => (m.n_nodes(), m.n_leaves(), m.depth()),
            Model::Forest(m) => (m.n_nodes(), m.n_leaves(), m.depth()),
            Model::ForestRegressor(m) => (m.n_nodes(), m.n_leaves(), m.depth()),
        }
    }

    fn feature_importances(&self) -> Result<Vec<f64>> {
        let importances = match self {
            Model::Tree(m) => m.feature_importances()?,
            Model::TreeRegressor(m) => m.feature_importances()?,
            Model::Forest(m) => m.feature_importances()?,
            Model::ForestRegressor(m) => m.feature_importances()?,
        };
        Ok(importances)
    }

    fn predict(&self, x: &[Vec<FeatureValue>]) -> Result<Predictions> {
        let predictions = match self {
            Model::Tree(m) => Predictions::Labels {
                predicted: m.predict(x)?,
                classes: m.classes().to_vec(),
            },
            Model::Forest(m) => Predictions::Labels {
                predicted: m.predict(x)?,
                classes: m.classes().to_vec(),
            },
            Model::TreeRegressor(m) => Predictions::Values(m.predict(x)?),
            Model::ForestRegressor(m) => Predictions::Values(m.predict(x)?),
        };
        Ok(predictions)
    }

    fn predict_proba(&self, x: &[Vec<FeatureValue>]) -> Result<Option<Vec<Vec<f64>>>> {
        let proba = match self {
            Model::Tree(m) => Some(m.predict_proba(x)?),
            Model::Forest(m) => Some(m.predict_proba(x)?),
            Model::TreeRegressor(_) | Model::ForestRegressor(_) => None,
        };
        Ok(proba)
    }
}

fn parse_criterion(s: &str) -> Result<Criterion> {
    match s {
        "gini" => Ok(Criterion::Gini),
        "entropy" => Ok(Criterion::Entropy),
        "mse" => Ok(Criterion::Mse),
        "mae" => Ok(Criterion::Mae),
        other => bail!("unknown criterion: {other} (expected gini, entropy, mse, or mae)"),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "all" => Ok(MaxFeatures::All),
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        other => {
            if let Ok(n) = other.parse::<usize>() {
                return Ok(MaxFeatures::Fixed(n));
            }
            match other.parse::<f64>() {
                Ok(f) => Ok(MaxFeatures::Fraction(f)),
                Err(_) => bail!(
                    "unknown max features: {other} (expected all, sqrt, log2, a count, or a fraction)"
                ),
            }
        }
    }
}

fn tree_config(args: &TreeArgs, seed: u64) -> Result<TreeConfig> {
    let mut config = TreeConfig::new()
        .with_max_depth(args.max_depth)
        .with_min_samples_split(args.min_samples_split)
        .with_min_samples_leaf(args.min_samples_leaf)
        .with_min_impurity_decrease(args.min_impurity_decrease)
        .with_ccp_alpha(args.ccp_alpha)
        .with_seed(seed);
    if let Some(criterion) = &args.criterion {
        config = config.with_criterion(parse_criterion(criterion)?);
    }
    if let Some(max_features) = &args.max_features {
        config = config.with_max_features(parse_max_features(max_features)?);
    }
    Ok(config)
}

fn read_dataset(data: &Path, target: Option<&str>) -> Result<Dataset> {
    let reader = match target {
        Some(column) => DatasetReader::new(data).with_target(column),
        None => DatasetReader::new(data),
    };
    reader
        .read()
        .with_context(|| format!("failed to read {}", data.display()))
}

fn check_width(model: &Model, dataset: &Dataset) -> Result<()> {
    if let Some(expected) = model.n_features()
        && expected != dataset.n_features()
    {
        bail!(
            "model expects {expected} feature columns but the data has {}",
            dataset.n_features()
        );
    }
    Ok(())
}

fn score(model: &Model, dataset: &Dataset) -> Result<f64> {
    match model.predict(dataset.features())? {
        Predictions::Labels { predicted, .. } => Ok(accuracy(&dataset.labels(), &predicted)?),
        Predictions::Values(predicted) => {
            Ok(r2_score(&dataset.regression_targets()?, &predicted)?)
        }
    }
}

fn train(args: &TrainArgs, seed: u64) -> Result<TrainOutput> {
    let dataset = read_dataset(&args.data, args.target.as_deref())?;
    let tree = tree_config(&args.tree, seed)?;
    let x = dataset.features();
    let output = args.output.as_path();

    let model = match (args.task, args.trees) {
        (Task::Classification, None) => {
            let mut m = DecisionTreeClassifier::new(tree);
            m.fit(x, &dataset.labels()).context("tree training failed")?;
            Model::Tree(m)
        }
        (Task::Regression, None) => {
            let mut m = DecisionTreeRegressor::new(tree);
            m.fit(x, &dataset.regression_targets()?)
                .context("tree training failed")?;
            Model::TreeRegressor(m)
        }
        (task, Some(n_trees)) => {
            let mut config = ForestConfig::new(n_trees)?
                .with_bootstrap(!args.no_bootstrap)
                .with_seed(seed);
            // An explicit per-split feature count overrides the forest default.
            if let Some(max_features) = &args.tree.max_features {
                config = config.with_max_features(parse_max_features(max_features)?);
            }
            let config = config.with_tree_config(tree);
            if task == Task::Classification {
                let mut m = RandomForestClassifier::new(config);
                m.fit(x, &dataset.labels()).context("forest training failed")?;
                Model::Forest(m)
            } else {
                let mut m = RandomForestRegressor::new(config);
                m.fit(x, &dataset.regression_targets()?)
                    .context("forest training failed")?;
                Model::ForestRegressor(m)
            }
        }
    };

    model
        .save(output)
        .with_context(|| format!("failed to save model to {}", output.display()))?;
    info!(path = %output.display(), "model saved");

    let (n_nodes, n_leaves, depth) = model.shape();
    Ok(TrainOutput {
        model_type: model.type_tag(),
        model_path: output.display().to_string(),
        n_samples: dataset.n_samples(),
        n_features: dataset.n_features(),
        n_trees: model.n_trees(),
        n_nodes,
        n_leaves,
        depth,
        training_score: score(&model, &dataset)?,
        feature_importances: rank_importances(
            &model.feature_importances()?,
            dataset.feature_names(),
        ),
    })
}

fn predict(
    model_path: &Path,
    data: &Path,
    target: Option<&str>,
    output: Option<&Path>,
    proba: bool,
) -> Result<()> {
    let model = Model::load(model_path)?;
    let reader = match target {
        Some(column) => DatasetReader::new(data).with_target(column),
        None => DatasetReader::new(data).without_target(),
    };
    let dataset = reader
        .read()
        .with_context(|| format!("failed to read {}", data.display()))?;
    check_width(&model, &dataset)?;

    let writer = match output {
        Some(path) => PredictionWriter::to_file(path),
        None => PredictionWriter::stdout(),
    };
    match model.predict(dataset.features()).context("prediction failed")? {
        Predictions::Labels { predicted, classes } => {
            let probabilities = if proba {
                model.predict_proba(dataset.features())?
            } else {
                None
            };
            writer.write_classification(
                model.type_tag(),
                &predicted,
                &classes,
                probabilities.as_deref(),
            )?;
        }
        Predictions::Values(predicted) => {
            writer.write_regression(model.type_tag(), &predicted)?;
        }
    }
    info!(n_samples = dataset.n_samples(), "prediction complete");
    Ok(())
}

fn evaluate(model_path: &Path, data: &Path, target: Option<&str>) -> Result<String> {
    let model = Model::load(model_path)?;
    let dataset = read_dataset(data, target)?;
    check_width(&model, &dataset)?;

    let report = match model.predict(dataset.features()).context("prediction failed")? {
        Predictions::Labels { predicted, .. } => {
            let cm = ConfusionMatrix::from_labels(&dataset.labels(), &predicted)?;
            info!("confusion matrix\n{cm}");
            serde_json::to_string_pretty(&ClassificationScore {
                model_type: model.type_tag(),
                n_samples: dataset.n_samples(),
                accuracy: cm.accuracy(),
                labels: cm.labels().to_vec(),
                confusion_matrix: cm.as_rows().to_vec(),
                class_metrics: cm.class_metrics(),
            })?
        }
        Predictions::Values(predicted) => {
            let y = dataset.regression_targets()?;
            serde_json::to_string_pretty(&RegressionScore {
                model_type: model.type_tag(),
                n_samples: dataset.n_samples(),
                mean_squared_error: mean_squared_error(&y, &predicted)?,
                mean_absolute_error: mean_absolute_error(&y, &predicted)?,
                r2: r2_score(&y, &predicted)?,
            })?
        }
    };
    Ok(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train(args) => {
            let summary = train(&args, cli.seed)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Predict {
            model,
            data,
            target,
            output,
            proba,
        } => {
            predict(&model, &data, target.as_deref(), output.as_deref(), proba)?;
        }

        Command::Evaluate {
            model,
            data,
            target,
        } => {
            println!("{}", evaluate(&model, &data, target.as_deref())?);
        }
    }

    Ok(())
}

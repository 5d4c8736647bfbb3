//! kernlearn Command Line Interface
//!
//! Train, apply and inspect kernel models on LibSVM format data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use kernlearn::api;
use kernlearn::config::{ParameterMap, TrainerConfig};
use kernlearn::core::{Dataset, InMemoryDataset, KernelError, Result};
use kernlearn::data::LibSVMDataset;
use kernlearn::persistence::SavedModel;
use kernlearn::KernelModel;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "kernlearn")]
#[command(about = "Kernel-based learning: SVM, RVM, kernel logistic regression and GP regression")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labelled data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Trainer backend
    #[arg(short, long)]
    algorithm: Option<CliAlgorithm>,

    /// Hyperparameter assignment key=value, may be repeated
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// JSON file with a flat object of hyperparameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat labels as real-valued targets
    #[arg(long)]
    regression: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliAlgorithm {
    /// Dual coordinate ascent (SVM, SVR, dual kernel logistic regression)
    #[value(name = "dual")]
    Dual,
    /// Relevance vector machine
    #[value(name = "relevance")]
    Relevance,
    /// Evolutionary kernel logistic regression
    #[value(name = "evolutionary")]
    Evolutionary,
    /// Sparse Gaussian process regression
    #[value(name = "gaussian_process")]
    GaussianProcess,
}

impl CliAlgorithm {
    fn param_value(self) -> &'static str {
        match self {
            CliAlgorithm::Dual => "dual",
            CliAlgorithm::Relevance => "relevance",
            CliAlgorithm::Evolutionary => "evolutionary",
            CliAlgorithm::GaussianProcess => "gaussian_process",
        }
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show confidence scores
    #[arg(long)]
    confidence: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Show detailed metrics
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

/// Config file first, then `--algorithm`, then `--param` assignments
fn collect_params(args: &TrainArgs) -> Result<ParameterMap> {
    let mut params = match &args.config {
        Some(path) => ParameterMap::from_json_file(path)?,
        None => ParameterMap::new(),
    };
    if let Some(algorithm) = args.algorithm {
        params.set("algorithm", algorithm.param_value());
    }
    params.merge(&ParameterMap::from_assignments(&args.params)?);
    Ok(params)
}

fn train_command(args: TrainArgs) -> Result<()> {
    let params = collect_params(&args)?;
    // Configuration problems surface before the data file is read.
    let config = TrainerConfig::from_params(&params)?;
    info!(
        "Training {} model with kernel {}",
        config.algorithm.algorithm().name(),
        config.kernel
    );

    info!("Data file: {:?}", args.data);
    let mut dataset = LibSVMDataset::from_file(&args.data)?;
    if args.regression {
        dataset = dataset.into_regression();
    }
    info!(
        "Loaded {} samples with {} dimensions",
        dataset.len(),
        dataset.dim()
    );

    let outcome = api::train(&dataset, &config)?;
    if !outcome.convergence.is_converged() {
        warn!(
            "Training stopped after {} iterations before meeting its stopping criterion",
            outcome.convergence.iterations()
        );
    }

    info!("Training completed successfully");
    info!("Support vectors: {}", outcome.model.n_support_vectors());
    info!("Bias: {:.6}", outcome.model.bias());

    let saved = SavedModel::from_outcome(&outcome, config.algorithm.algorithm());
    saved.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    // Quick evaluation on training data
    if outcome.model.is_classification() {
        let metrics = api::evaluate(&outcome.model, &dataset)?;
        info!("Training accuracy: {:.2}%", metrics.accuracy() * 100.0);
    } else {
        let metrics = api::evaluate_regression(&outcome.model, &dataset)?;
        info!("Training RMSE: {:.6}", metrics.rmse);
    }

    Ok(())
}

/// Densify a LibSVM file to the model's width, keeping its targets
fn load_for_model(path: &Path, model: &KernelModel) -> Result<InMemoryDataset> {
    let dataset = LibSVMDataset::from_file(path)?;
    let dim = model.dim();
    let mut rows = Vec::with_capacity(dataset.len());
    for i in 0..dataset.len() {
        let sparse = dataset.sparse_row(i);
        if sparse.min_dim() > dim {
            return Err(KernelError::DimensionMismatch {
                context: "data row".to_string(),
                expected: dim,
                actual: sparse.min_dim(),
            });
        }
        rows.push(sparse.to_dense(dim));
    }

    // Labels are matched against the model's classes
    Ok(match model.class_names() {
        Some(classes) => InMemoryDataset::classification(rows, dataset.targets_for(classes)?)
            .with_class_names(classes.clone()),
        None => InMemoryDataset::regression(rows, dataset.into_regression().targets()),
    })
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let saved = SavedModel::load_from_file(&args.model)?;
    info!(
        "Making predictions using model with {} support vectors",
        saved.metadata.n_support_vectors
    );
    let model = saved.into_model();

    info!("Loading prediction data from: {:?}", args.data);
    let dataset = load_for_model(&args.data, &model)?;
    let predictions = api::predict_dataset(&model, &dataset)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    writeln!(writer, "# Predictions for {} samples", predictions.len())?;
    writeln!(
        writer,
        "# Format: sample_index prediction{}",
        if args.confidence { " confidence" } else { "" }
    )?;

    for (i, pred) in predictions.iter().enumerate() {
        match model.class_names() {
            Some(classes) => {
                let name = classes.name_for(pred.label);
                if args.confidence {
                    writeln!(writer, "{} {} {:.6}", i, name, pred.confidence())?;
                } else {
                    writeln!(writer, "{} {}", i, name)?;
                }
            }
            None => writeln!(writer, "{} {:.6}", i, pred.label)?,
        }
    }
    writer.flush()?;

    if let Some(path) = args.output {
        info!("Predictions saved to: {path:?}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let saved = SavedModel::load_from_file(&args.model)?;
    let model = saved.model.clone();

    info!("Loading test data from: {:?}", args.data);
    let dataset = load_for_model(&args.data, &model)?;

    println!("=== Model Evaluation ===");
    saved.print_summary();
    println!("\nTest Results:");

    if model.is_classification() {
        let metrics = api::evaluate(&model, &dataset)?;
        println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

        if args.detailed {
            println!("\nDetailed Metrics:");
            println!("  True Positives:  {}", metrics.true_positives);
            println!("  True Negatives:  {}", metrics.true_negatives);
            println!("  False Positives: {}", metrics.false_positives);
            println!("  False Negatives: {}", metrics.false_negatives);
            println!("  Precision:       {:.4}", metrics.precision());
            println!("  Recall:          {:.4}", metrics.recall());
            println!("  F1 Score:        {:.4}", metrics.f1_score());
        }
    } else {
        let metrics = api::evaluate_regression(&model, &dataset)?;
        println!("  RMSE: {:.6}", metrics.rmse);
        if args.detailed {
            println!("  MAE:  {:.6}", metrics.mae);
            println!("  Samples: {}", metrics.count);
        }
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let saved = SavedModel::load_from_file(&args.model)?;

    saved.print_summary();

    println!("\nDecision function:");
    print!("{}", saved.model.formula());

    if let Ok(weights) = saved.model.feature_weights() {
        println!("\nFeature weights:");
        for (name, weight) in weights {
            println!("  {name}: {weight:.6}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_precedence() {
        let args = TrainArgs {
            data: PathBuf::from("train.libsvm"),
            output: PathBuf::from("model.json"),
            algorithm: Some(CliAlgorithm::Relevance),
            params: vec!["algorithm=gaussian_process".to_string(), "C=2".to_string()],
            config: None,
            regression: false,
        };
        let params = collect_params(&args).unwrap();
        assert_eq!(params.get("algorithm"), Some("gaussian_process"));
        assert_eq!(params.get("C"), Some("2"));
    }

    #[test]
    fn test_bad_assignment() {
        let args = TrainArgs {
            data: PathBuf::from("train.libsvm"),
            output: PathBuf::from("model.json"),
            algorithm: None,
            params: vec!["kernel_type".to_string()],
            config: None,
            regression: false,
        };
        assert!(matches!(collect_params(&args), Err(KernelError::ParseError(_))));
    }
}

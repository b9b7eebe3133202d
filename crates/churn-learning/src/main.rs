//! CLI entry point for churn model training and scoring.

use anyhow::{Context, Result, anyhow};
use churn_learning::{
    ConfusionMatrix, EvaluationReport, ForestParams, Pipeline, PipelineConfig, TrainingResult,
};
use clap::{Parser, Subcommand};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Customer churn prediction pipeline",
    long_about = "Train a churn classifier on a telco-style CSV, then score new customers.\n\n\
                  EXAMPLES:\n  \
                  # Train and save a model\n  \
                  churn train -i telco.csv -m churn.bin\n\n  \
                  # Score new customers\n  \
                  churn predict -i customers.csv -m churn.bin -o scores.csv\n\n  \
                  # Evaluate a saved model on labeled data\n  \
                  churn evaluate -i holdout.csv -m churn.bin"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model on a labeled CSV and save it
    Train {
        /// Path to the training CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the model artifact
        #[arg(short, long, default_value = "churn_model.bin")]
        model: PathBuf,

        /// Number of trees in the forest
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Maximum tree depth (0 for unlimited)
        #[arg(long, default_value = "10")]
        max_depth: usize,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Stratified cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Neighbors considered by SMOTE
        #[arg(long, default_value = "5")]
        smote_k: usize,

        /// Random seed for split, resampling, folds and forest
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Version tag for the model (defaults to a timestamp)
        #[arg(long)]
        model_version: Option<String>,
    },

    /// Score an unlabeled CSV with a saved model
    Predict {
        /// Path to the CSV to score
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Where to write scores (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a saved model on a labeled CSV
    Evaluate {
        /// Path to the labeled CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the model artifact
        #[arg(short, long)]
        model: PathBuf,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    match args.command {
        Command::Train {
            ref input,
            ref model,
            trees,
            max_depth,
            test_size,
            cv_folds,
            smote_k,
            seed,
            ref model_version,
        } => {
            let forest = ForestParams::default()
                .with_n_estimators(trees)
                .with_max_depth((max_depth > 0).then_some(max_depth));
            let mut builder = PipelineConfig::builder()
                .forest(forest)
                .test_size(test_size)
                .cv_folds(cv_folds)
                .smote_k_neighbors(smote_k)
                .random_seed(seed);
            if let Some(version) = model_version {
                builder = builder.model_version(version);
            }
            run_train(&args, input, model, builder.build()?)
        }
        Command::Predict {
            ref input,
            ref model,
            ref output,
        } => run_predict(input, model, output.as_deref()),
        Command::Evaluate {
            ref input,
            ref model,
        } => run_evaluate(&args, input, model),
    }
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }
    info!("Loading dataset from: {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
    info!("Dataset loaded: {:?}", df.shape());
    Ok(df)
}

fn run_train(args: &Args, input: &Path, model_path: &Path, config: PipelineConfig) -> Result<()> {
    let df = load_csv(input)?;

    let mut pipeline = Pipeline::builder().config(config).build()?;

    let result = pipeline.train(&df)?;
    pipeline.save(model_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_training_summary(&result, model_path);
    }
    Ok(())
}

fn run_predict(input: &Path, model_path: &Path, output: Option<&Path>) -> Result<()> {
    let df = load_csv(input)?;
    let pipeline = load_pipeline(model_path)?;

    let (probabilities, classes) = pipeline.score(&df)?;
    let predictions: Vec<u32> = classes.into_iter().map(|class| class as u32).collect();

    let mut columns = Vec::with_capacity(3);
    if let Some(model) = pipeline.model()
        && let Some(id) = model.transform_state().spec().id_column()
        && let Ok(ids) = df.column(id)
    {
        columns.push(ids.clone());
    }
    columns.push(Column::new("churn_probability".into(), probabilities));
    columns.push(Column::new("churn_prediction".into(), predictions));
    let mut scores = DataFrame::new(columns)?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            CsvWriter::new(file).include_header(true).finish(&mut scores)?;
            info!("Wrote {} scores to {}", scores.height(), path.display());
        }
        None => {
            CsvWriter::new(std::io::stdout())
                .include_header(true)
                .finish(&mut scores)?;
        }
    }
    Ok(())
}

fn run_evaluate(args: &Args, input: &Path, model_path: &Path) -> Result<()> {
    let df = load_csv(input)?;
    let pipeline = load_pipeline(model_path)?;
    let report = pipeline.evaluate(&df)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_evaluation(&report);
    }
    Ok(())
}

fn load_pipeline(model_path: &Path) -> Result<Pipeline> {
    let mut pipeline = Pipeline::builder()
        .config(PipelineConfig::default())
        .build()?;
    pipeline
        .load(model_path)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;
    Ok(pipeline)
}

/// Note: this uses `println!` intentionally; the summary is the command's
/// output and must show regardless of log level.
fn print_training_summary(result: &TrainingResult, model_path: &Path) {
    println!("\n{}", "=".repeat(60));
    println!("CHURN MODEL TRAINING COMPLETE");
    println!("{}\n", "=".repeat(60));

    println!("  Model version:   {}", result.model_version);
    println!("  Classifier:      {}", result.classifier);
    println!("  Saved to:        {}", model_path.display());
    println!(
        "  Rows:            {} train ({} after SMOTE), {} test",
        result.train_rows, result.resampled_rows, result.test_rows
    );
    println!(
        "  CV accuracy:     {:.4} (+/- {:.4})",
        result.cross_validation.mean,
        2.0 * result.cross_validation.std
    );
    println!("  Training time:   {:.2}s", result.training_time_seconds);
    for warning in &result.warnings {
        println!("  WARNING: {warning}");
    }
    println!();

    print_evaluation(&result.evaluation);

    println!("TOP 10 FEATURE IMPORTANCES");
    println!("{}", "-".repeat(40));
    for (rank, feature) in result.top_features(10).iter().enumerate() {
        println!(
            "  {:>2}. {:<28} {:.4}",
            rank + 1,
            feature.feature,
            feature.importance
        );
    }
    println!();
}

fn print_evaluation(report: &EvaluationReport) {
    println!("CLASSIFICATION REPORT");
    println!("{}", "-".repeat(40));
    println!("{report}\n");

    println!("CONFUSION MATRIX");
    println!("{}", "-".repeat(40));
    print_confusion_matrix(&report.confusion_matrix);
    println!();
}

fn print_confusion_matrix(cm: &ConfusionMatrix) {
    println!("  {:<14} {:>10} {:>10}", "actual \\ pred", "No churn", "Churn");
    for (name, row) in ["No churn", "Churn"].iter().zip(cm.matrix.iter()) {
        println!("  {:<14} {:>10} {:>10}", name, row[0], row[1]);
    }
}

// ========================================================================================
//
//                         THE ANALYSIS ORCHESTRATOR: SYSTOLE
//
// ========================================================================================
//
// This module owns the application lifecycle from argument parsing to final output.
// It wires the pipeline stages defined by the library crate into three commands:
// `analyze` runs the whole pipeline and prints the report, `train` fits and saves a
// model artifact, and `evaluate` applies a saved model to labelled data. All analysis
// logic lives in the library; this file only sequences it and talks to the user.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::fs;
use std::process;

use systole::data::{Dataset, FEATURE_COLUMNS, load_dataset};
use systole::evaluate::{Evaluation, evaluate_model};
use systole::fit::fit_logistic;
use systole::model::{FitConfig, FittedModel};
use systole::report::{render_evaluation, render_report};
use systole::split::{SplitConfig, stratified_split};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the heart disease CSV file
    pub data: String,

    /// Fraction of each outcome group assigned to the training set
    #[arg(long, default_value = "0.7")]
    pub train_fraction: f64,

    /// Seed for the deterministic train/test shuffle
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Probability threshold for classifying a record as diseased
    #[arg(long, default_value = "0.5")]
    pub threshold: f64,

    /// Maximum number of IRLS iterations before the fit is abandoned
    #[arg(long, default_value = "25")]
    pub max_iterations: usize,

    /// Convergence tolerance on the largest coefficient change
    #[arg(long, default_value = "1e-8")]
    pub tolerance: f64,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct TrainArgs {
    /// Path to the heart disease CSV file
    pub data: String,

    /// Fraction of each outcome group assigned to the training set
    #[arg(long, default_value = "0.7")]
    pub train_fraction: f64,

    /// Seed for the deterministic train/test shuffle
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum number of IRLS iterations before the fit is abandoned
    #[arg(long, default_value = "25")]
    pub max_iterations: usize,

    /// Convergence tolerance on the largest coefficient change
    #[arg(long, default_value = "1e-8")]
    pub tolerance: f64,
}

#[derive(Args)]
pub struct EvaluateArgs {
    /// Path to a labelled heart disease CSV file to score
    pub data: String,

    /// Path to a trained model file (.toml)
    #[arg(long)]
    pub model: String,

    /// Probability threshold for classifying a record as diseased
    #[arg(long, default_value = "0.5")]
    pub threshold: f64,
}

pub fn analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_threshold(args.threshold)?;

    let dataset = load_dataset(&args.data)?;
    let split_config = SplitConfig {
        train_fraction: args.train_fraction,
        seed: args.seed,
    };
    let split = stratified_split(&dataset, &split_config)?;

    let fit_config = FitConfig {
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
    };
    let model = fit_logistic(
        split.train.features(),
        split.train.labels(),
        &FEATURE_COLUMNS,
        &fit_config,
    )?;
    let evaluation = evaluate_model(&model, &split.test, args.threshold)?;

    let report = render_report(&dataset, &split, &model, &evaluation);
    match &args.output {
        Some(path) => {
            fs::write(path, &report)?;
            println!("Report written to: {path}");
        }
        None => print!("{report}"),
    }
    Ok(())
}

pub fn train(args: TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading data from: {}", args.data);
    let dataset = load_dataset(&args.data)?;
    println!(
        "Loaded {} records with {} attributes each",
        dataset.n_records(),
        dataset.n_features()
    );

    let split_config = SplitConfig {
        train_fraction: args.train_fraction,
        seed: args.seed,
    };
    let split = stratified_split(&dataset, &split_config)?;
    println!(
        "Fitting logistic regression on {} training records...",
        split.train.n_records()
    );

    let fit_config = FitConfig {
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
    };
    let model = fit_logistic(
        split.train.features(),
        split.train.labels(),
        &FEATURE_COLUMNS,
        &fit_config,
    )?;
    print!("{}", model.summary());

    model.save("model.toml")?;
    println!("Model saved to: model.toml");
    Ok(())
}

pub fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_threshold(args.threshold)?;

    println!("Loading model from: {}", args.model);
    let model = FittedModel::load(&args.model)?;

    println!("Loading data from: {}", args.data);
    let dataset = load_dataset(&args.data)?;
    println!("Scoring {} records", dataset.n_records());

    let evaluation = evaluate_model(&model, &dataset, args.threshold)?;
    print!("{}", render_evaluation(&evaluation));

    save_predictions("predictions.tsv", &dataset, &evaluation)?;
    println!("Predictions saved to: predictions.tsv");
    Ok(())
}

fn validate_threshold(threshold: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !(threshold > 0.0 && threshold < 1.0) {
        return Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "--threshold must lie strictly between 0 and 1",
        )));
    }
    Ok(())
}

/// Writes one row per scored record: the fitted probability of disease, the
/// thresholded class, and the observed class.
fn save_predictions(
    output_path: &str,
    dataset: &Dataset,
    evaluation: &Evaluation,
) -> Result<(), std::io::Error> {
    use std::io::Write;

    let mut file = std::fs::File::create(output_path)?;
    writeln!(file, "record\tprobability\tpredicted\tobserved")?;
    for i in 0..dataset.n_records() {
        writeln!(
            file,
            "{}\t{}\t{}\t{}",
            i + 1,
            evaluation.predictions.probabilities[i],
            evaluation.predictions.predicted[i] as i64,
            dataset.labels()[i] as i64
        )?;
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "systole",
    version,
    about = "A statistical pipeline for heart disease risk analysis",
    long_about = "Loads the fixed-schema heart disease dataset, fits a logistic regression \
                 model on a stratified training split, and reports descriptive statistics, \
                 model diagnostics, and held-out classification performance."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the analysis report
    #[command(about = "Run the full analysis pipeline (load, split, fit, evaluate, report)")]
    Analyze(AnalyzeArgs),

    /// Fit a logistic regression model on the training split
    #[command(about = "Fit a model and save it (outputs: model.toml)")]
    Train(TrainArgs),

    /// Apply a saved model to labelled data
    #[command(about = "Evaluate a saved model (outputs: predictions.tsv)")]
    Evaluate(EvaluateArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Analyze(args)) => analyze(args),
        Some(Commands::Train(args)) => train(args),
        Some(Commands::Evaluate(args)) => evaluate(args),
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

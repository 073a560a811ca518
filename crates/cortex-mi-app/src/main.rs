//! Cortex MI Application
//!
//! Command-line entry point for motor-imagery classification on the PhysioNet
//! EEG Motor Movement/Imagery recordings.
//!
//! # Usage
//!
//! ```bash
//! # Inspect the filtered recording of one subject/task
//! cortex-mi preprocess -s 1 -t 2
//!
//! # Train one pair, or every subject on every task
//! cortex-mi train -s 1 -t 2
//! cortex-mi train -a
//!
//! # Predict the held-out epochs of one pair, or of every trained pair
//! cortex-mi predict -s 1 -t 2
//! cortex-mi predict -a --quiet
//!
//! # Accuracy table over every trained pair
//! cortex-mi accuracy
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use cortex_mi_core::{ArtifactKey, ExperimentConfig, SubjectId, TaskId};
use cortex_mi_native::workflow::{accuracy_sweep, train_all};
use cortex_mi_native::{
    ArtifactRegistry, Evaluator, FsArtifactRegistry, PhysionetLoader, PredictionReport, RawRecording, Trainer, TrainingReport,
};

/// Cortex MI Application
#[derive(Parser, Debug)]
#[command(name = "cortex-mi")]
#[command(author, version, about = "Motor-imagery EEG classification with Common Spatial Patterns", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Experiment configuration file (JSON); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root of the recording tree, overrides the configuration file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for trained pipelines and test splits, overrides the configuration file
    #[arg(long, global = true)]
    artifact_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// A single (subject, task) pair; missing values are prompted for.
#[derive(Args, Debug)]
struct Target {
    /// Subject number (1..=110)
    #[arg(short, long)]
    subject: Option<u8>,

    /// Task number (1..=4 with the default catalog)
    #[arg(short, long)]
    task: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, filter and summarize the recording of one subject/task
    Preprocess {
        #[command(flatten)]
        target: Target,
    },

    /// Train and persist the pipeline of one pair or of all pairs
    Train {
        /// Train every subject on every task
        #[arg(short, long, conflicts_with_all = ["subject", "task"])]
        all_subjects: bool,

        #[command(flatten)]
        target: Target,
    },

    /// Predict the held-out epochs of one pair or of all trained pairs
    Predict {
        /// Predict every subject on every task
        #[arg(short, long, conflicts_with_all = ["subject", "task"])]
        all_subjects: bool,

        /// Only print the accuracy, not the per-epoch trace
        #[arg(short, long)]
        quiet: bool,

        #[command(flatten)]
        target: Target,
    },

    /// Accuracy of every trained pair with per-task and overall means
    Accuracy,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Cortex MI v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Preprocess { target } => {
            let (subject, task) = resolve_target(&target, &config)?;
            run_preprocess(&config, subject, task)?;
        }
        Commands::Train { all_subjects, target } => {
            let trainer = Trainer::new(loader(&config), registry(&config), config.clone());
            if all_subjects {
                let summary = train_all(&trainer, SubjectId::all(), &config.catalog, print_training);
                println!(
                    "\nTrained {} pairs, {} failed.",
                    summary.reports.len(),
                    summary.failed.len()
                );
            } else {
                let (subject, task) = resolve_target(&target, &config)?;
                println!("Training model for subject {subject} on task {task}.");
                print_training(&trainer.train(subject, task)?);
            }
        }
        Commands::Predict {
            all_subjects,
            quiet,
            target,
        } => {
            let evaluator = Evaluator::new(registry(&config));
            if all_subjects {
                let failed = run_predict_all(&evaluator, &config, quiet);
                if !failed.is_empty() {
                    println!("\n{} pairs failed to evaluate.", failed.len());
                }
            } else {
                let (subject, task) = resolve_target(&target, &config)?;
                let report = evaluator.evaluate(ArtifactKey::new(subject, task))?;
                print_prediction(&report, quiet);
            }
        }
        Commands::Accuracy => {
            run_accuracy(&Evaluator::new(registry(&config)), &config);
        }
    }

    Ok(())
}

/// Read the configuration file (if any), apply directory overrides and validate.
fn load_config(cli: &Cli) -> anyhow::Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read configuration {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid configuration {}", path.display()))?
        }
        None => ExperimentConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.artifact_dir {
        config.artifact_dir.clone_from(dir);
    }

    config.validate()?;
    debug!(?config, "Configuration loaded");
    Ok(config)
}

fn loader(config: &ExperimentConfig) -> PhysionetLoader {
    PhysionetLoader::new(
        config.data_dir.clone(),
        config.catalog.clone(),
        config.preprocess.clone(),
        config.split.clone(),
    )
}

fn registry(config: &ExperimentConfig) -> FsArtifactRegistry {
    FsArtifactRegistry::new(config.artifact_dir.clone())
}

/// Validate the requested pair, prompting on stdin for whatever was omitted.
fn resolve_target(target: &Target, config: &ExperimentConfig) -> anyhow::Result<(SubjectId, TaskId)> {
    let subject = match target.subject {
        Some(number) => number,
        None => prompt_number(&format!(
            "Enter a subject number ({}<=subject<={})",
            SubjectId::MIN,
            SubjectId::MAX
        ))?,
    };
    let subject = SubjectId::new(subject)?;

    let (first, last) = config.catalog.range();
    let task = match target.task {
        Some(number) => number,
        None => prompt_number(&format!("Enter a task number ({first}<=task<={last})"))?,
    };
    let task = TaskId::new(task);
    config.catalog.get(task)?;

    Ok((subject, task))
}

fn prompt_number(message: &str) -> anyhow::Result<u8> {
    print!("{message}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    line.trim()
        .parse()
        .with_context(|| format!("Expected a number, got {:?}", line.trim()))
}

fn run_preprocess(config: &ExperimentConfig, subject: SubjectId, task: TaskId) -> anyhow::Result<()> {
    println!("Preprocessing data for subject {subject}.");
    let raw = loader(config).load_filtered(subject, task)?;
    print_recording(&raw);
    Ok(())
}

fn print_recording(raw: &RawRecording) {
    let summary = raw.describe();

    println!(
        "{} channels, {} samples at {:.1} Hz ({:.1} s)",
        summary.n_channels, summary.n_samples, summary.sample_rate, summary.duration_s
    );
    for (description, count) in &summary.annotation_counts {
        println!("  {description}: {count} annotations");
    }

    println!("\n{:<8} {:>12} {:>12} {:>12}", "channel", "min (uV)", "max (uV)", "mean (uV)");
    for channel in &summary.channels {
        println!(
            "{:<8} {:>12.3} {:>12.3} {:>12.3}",
            channel.name,
            channel.min * 1e6,
            channel.max * 1e6,
            channel.mean * 1e6
        );
    }
}

fn print_training(report: &TrainingReport) {
    println!("Model for subject {} on task {}:", report.key.subject, report.key.task);
    println!("  Cross validation score: {:.2}", report.cv_mean());
    println!("  Prediction accuracy on training dataset: {:.2}", report.train_score);
    println!("  Prediction accuracy on test dataset: {:.2}", report.test_score);
}

fn print_prediction(report: &PredictionReport, quiet: bool) {
    if !quiet {
        println!("epoch nb: [prediction] [truth] equal?");
        for prediction in &report.predictions {
            println!(
                "epoch {:02}: [{}] [{}] {}",
                prediction.index, prediction.predicted, prediction.expected, prediction.correct
            );
        }
    }
    println!(
        "Subject {} task {} accuracy: {:.4} ({}/{})",
        report.key.subject,
        report.key.task,
        report.accuracy(),
        report.correct(),
        report.predictions.len()
    );
}

/// Predict every trained pair, returning the pairs whose evaluation failed.
fn run_predict_all<R: ArtifactRegistry>(
    evaluator: &Evaluator<R>,
    config: &ExperimentConfig,
    quiet: bool,
) -> Vec<ArtifactKey> {
    let mut failed = Vec::new();
    for subject in SubjectId::all() {
        for task in config.catalog.ids() {
            let key = ArtifactKey::new(subject, task);
            match evaluator.evaluate(key) {
                Ok(report) => print_prediction(&report, quiet),
                Err(e) if e.is_not_trained() => {
                    println!("Model not trained for subject {subject} on task {task}.");
                }
                Err(e) => {
                    error!(%key, error = %e, "Prediction failed, skipping");
                    println!("Prediction failed for subject {subject} on task {task}: {e}");
                    failed.push(key);
                }
            }
        }
    }
    failed
}

fn run_accuracy(evaluator: &Evaluator<FsArtifactRegistry>, config: &ExperimentConfig) {
    let summary = accuracy_sweep(evaluator, SubjectId::all(), &config.catalog);

    for (key, accuracy) in &summary.entries {
        println!(
            "experiment {} subject {:03} accuracy = {accuracy:.2}",
            key.task,
            key.subject.get()
        );
    }

    for key in &summary.failed {
        println!(
            "experiment {} subject {:03} failed to evaluate",
            key.task,
            key.subject.get()
        );
    }

    let Some(overall) = summary.overall_mean() else {
        println!("No trained models found in {}.", config.artifact_dir.display());
        return;
    };

    println!(
        "\nMean accuracy of the {} experiments for all {} subjects:",
        config.catalog.len(),
        SubjectId::MAX
    );
    for (task, mean) in summary.task_means() {
        println!("experiment {task}: {mean:.2}");
    }
    println!("\nMean accuracy of {} experiments: {overall:.2}", config.catalog.len());
}

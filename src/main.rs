//! Cataract Classification CLI
//!
//! Entry point for the retinal fundus image classification pipeline:
//! load the cataract and normal image folders, tune the CNN with random
//! search, retrain the best configuration and report metrics on every
//! split.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cataract_cnn::backend::{backend_name, default_device, TrainingBackend};
use cataract_cnn::pipeline::{run_experiment, ExperimentConfig, ExperimentReport, SplitReport};
use cataract_cnn::tuner::space::classifier_search_space;
use cataract_cnn::utils::logging::{init_logging, LogConfig};
use cataract_cnn::{
    ClassFolder, FundusDataset, SplitConfig, IMAGE_SIZE, LABEL_CATARACT, LABEL_NORMAL, SPLIT_SEED,
};

/// Cataract Detection from Retinal Fundus Images
///
/// Trains a hyperparameter-tuned CNN on two labeled image folders and
/// evaluates it on deterministic train/validation/test splits.
#[derive(Parser, Debug)]
#[command(name = "cataract_cnn")]
#[command(version = "0.1.0")]
#[command(about = "Cataract vs. normal fundus image classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full tuning and training pipeline
    Run {
        /// Directory with cataract images
        #[arg(long, default_value = "data/cataract")]
        cataract_dir: PathBuf,

        /// Directory with normal images
        #[arg(long, default_value = "data/normal")]
        normal_dir: PathBuf,

        /// Test fraction(s); the experiment runs once per value
        #[arg(long = "test-fraction", num_args = 1.., default_values = ["0.20", "0.35"])]
        test_fractions: Vec<f64>,

        /// Fraction of the non-test remainder used for validation
        #[arg(long, default_value = "0.10")]
        val_fraction: f64,

        /// Seed for both split stages
        #[arg(long, default_value_t = SPLIT_SEED)]
        seed: u64,

        /// Number of random-search trials
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Epochs per search trial
        #[arg(long, default_value = "10")]
        search_epochs: usize,

        /// Epochs for the final training run
        #[arg(short, long, default_value = "15")]
        epochs: usize,

        /// Batch size for training and evaluation
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Adam learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Edge length images are resized to
        #[arg(long, default_value_t = IMAGE_SIZE)]
        image_size: usize,

        /// Seed for the hyperparameter search RNG
        #[arg(long, default_value_t = SPLIT_SEED)]
        search_seed: u64,

        /// Write the full reports to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show dataset statistics
    Stats {
        /// Directory with cataract images
        #[arg(long, default_value = "data/cataract")]
        cataract_dir: PathBuf,

        /// Directory with normal images
        #[arg(long, default_value = "data/normal")]
        normal_dir: PathBuf,

        /// Edge length images are resized to
        #[arg(long, default_value_t = IMAGE_SIZE)]
        image_size: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Run {
            cataract_dir,
            normal_dir,
            test_fractions,
            val_fraction,
            seed,
            trials,
            search_epochs,
            epochs,
            batch_size,
            learning_rate,
            image_size,
            search_seed,
            output,
        } => {
            cmd_run(
                &cataract_dir,
                &normal_dir,
                &test_fractions,
                val_fraction,
                seed,
                trials,
                search_epochs,
                epochs,
                batch_size,
                learning_rate,
                image_size,
                search_seed,
                output.as_deref(),
            )?;
        }

        Commands::Stats {
            cataract_dir,
            normal_dir,
            image_size,
        } => {
            cmd_stats(&cataract_dir, &normal_dir, image_size)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════╗
 ║   👁  Cataract Detection CNN                          ║
 ║   Fundus Image Classification with Burn + Rust       ║
 ╚══════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn class_folders(cataract_dir: &std::path::Path, normal_dir: &std::path::Path) -> Vec<ClassFolder> {
    vec![
        ClassFolder::new(cataract_dir, LABEL_CATARACT, "cataract"),
        ClassFolder::new(normal_dir, LABEL_NORMAL, "normal"),
    ]
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    cataract_dir: &std::path::Path,
    normal_dir: &std::path::Path,
    test_fractions: &[f64],
    val_fraction: f64,
    seed: u64,
    trials: usize,
    search_epochs: usize,
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    image_size: usize,
    search_seed: u64,
    output: Option<&std::path::Path>,
) -> Result<()> {
    println!("  Backend: {}", backend_name());
    println!();

    println!("{}", "Loading Dataset...".cyan().bold());
    let classes = class_folders(cataract_dir, normal_dir);
    let dataset = FundusDataset::load(&classes, image_size)?;
    dataset.stats().print();

    let space = classifier_search_space()?;
    let device = default_device();

    let mut reports: Vec<ExperimentReport> = Vec::with_capacity(test_fractions.len());

    for &test_fraction in test_fractions {
        println!();
        println!(
            "{}",
            format!("Experiment: test fraction {:.2}", test_fraction)
                .yellow()
                .bold()
        );

        let config = ExperimentConfig {
            split: SplitConfig::new(test_fraction, val_fraction, seed)?,
            space: space.clone(),
            max_trials: trials,
            search_epochs,
            final_epochs: epochs,
            batch_size,
            learning_rate,
            image_size,
            search_seed,
        };

        let report = run_experiment::<TrainingBackend>(device, &dataset, &config)?;
        print_report(&report);
        reports.push(report);
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json)?;
        info!("Reports written to {:?}", path);
        println!();
        println!("{} Reports saved to {:?}", "✔".green(), path);
    }

    Ok(())
}

fn print_report(report: &ExperimentReport) {
    println!();
    println!("{}", "Split Sizes:".cyan().bold());
    println!("  Train:      {}", report.train_size);
    println!("  Validation: {}", report.validation_size);
    println!("  Test:       {}", report.test_size);

    println!();
    println!("{}", "Search Trials:".cyan().bold());
    for trial in &report.search.trials {
        let marker = if trial.index == report.search.best.index {
            " ← best"
        } else {
            ""
        };
        println!(
            "  Trial {}: score {:.4}{}",
            trial.index + 1,
            trial.score,
            marker
        );
    }
    println!("  Best configuration: {}", report.search.best.config);

    for split in [&report.validation, &report.test, &report.train] {
        print_split_report(split);
    }
}

fn print_split_report(split: &SplitReport) {
    println!();
    println!(
        "{}",
        format!("=== {} set ===", split.name).yellow().bold()
    );
    println!("  Loss: {:.4}", split.loss);
    println!("{}", split.metrics.display());

    let names: Vec<&str> = split
        .metrics
        .per_class
        .iter()
        .map(|c| c.class_name.as_deref().unwrap_or("?"))
        .collect();
    println!("{}", split.metrics.confusion_matrix.display(Some(&names)));
    println!("{}", split.metrics.classification_report());
}

fn cmd_stats(
    cataract_dir: &std::path::Path,
    normal_dir: &std::path::Path,
    image_size: usize,
) -> Result<()> {
    let classes = class_folders(cataract_dir, normal_dir);
    let dataset = FundusDataset::load(&classes, image_size)?;
    dataset.stats().print();
    Ok(())
}

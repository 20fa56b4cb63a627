//! Genre Model Training Utility
//!
//! Trains the genre classifier on synthetic feature vectors and writes the
//! model bundle the API loads at startup.
//!
//! **Usage:**
//! ```bash
//! mgc-train [--output <file>] [--samples-per-genre N] [--max-epochs N] [--seed N]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mgc_common::config::load_service_config;
use mgc_common::training::{
    train_on_synthetic, TrainerConfig, TrainingOptions, DEFAULT_SAMPLES_PER_GENRE,
};

/// Genre model training utility
#[derive(Parser, Debug)]
#[command(name = "mgc-train")]
#[command(about = "Train the genre classifier on synthetic features")]
#[command(version)]
struct Args {
    /// Configuration file (TOML); its model_path is the default output
    #[arg(short, long, env = "MGC_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the model bundle
    #[arg(short, long, value_name = "FILE", env = "MGC_MODEL_PATH")]
    output: Option<PathBuf>,

    /// Synthetic rows generated per genre
    #[arg(long, default_value_t = DEFAULT_SAMPLES_PER_GENRE)]
    samples_per_genre: usize,

    /// Upper bound on training epochs
    #[arg(long, default_value_t = 500)]
    max_epochs: usize,

    /// Seed for weight init, shuffling and the train/test split
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let output = match args.output {
        Some(path) => path,
        None => load_service_config(args.config.as_deref())
            .context("Failed to load configuration")?
            .resolved_model_path(),
    };

    info!("Music genre classification - model training");

    let options = TrainingOptions {
        samples_per_genre: args.samples_per_genre,
        split_seed: args.seed,
        trainer: TrainerConfig {
            max_epochs: args.max_epochs,
            seed: args.seed,
            ..TrainerConfig::default()
        },
    };

    let outcome = train_on_synthetic(&options).context("Training failed")?;

    info!(
        "Trained for {} epochs{}",
        outcome.history.epochs_run(),
        if outcome.history.stopped_early {
            " (early stop)"
        } else {
            ""
        }
    );
    if let Some(best) = outcome.history.best_validation_score {
        info!("Best validation accuracy: {:.4}", best);
    }
    info!("Test accuracy: {:.4}", outcome.report.accuracy);
    info!("Classification report:\n{}", outcome.report);

    outcome
        .bundle
        .save(&output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;
    info!("Model saved to: {}", output.display());

    Ok(())
}

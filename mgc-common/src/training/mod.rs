//! Offline training pipeline
//!
//! Synthetic data → label encoding → stratified split → scaling → MLP
//! training → evaluation → [`TrainedModelBundle`].

pub mod metrics;
pub mod split;
pub mod synthetic;
pub mod trainer;

pub use metrics::{accuracy, ClassMetrics, ClassificationReport};
pub use split::stratified_split;
pub use synthetic::{generate_synthetic_data, Dataset, DEFAULT_SAMPLES_PER_GENRE};
pub use trainer::{train, TrainerConfig, TrainingHistory};

use ndarray::Axis;
use tracing::info;

use crate::classifier::{LabelEncoder, StandardScaler, TrainedModelBundle};
use crate::{Error, Result};

/// Fraction of rows held out for the final evaluation
pub const TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub samples_per_genre: usize,
    /// Seed for the train/test split
    pub split_seed: u64,
    pub trainer: TrainerConfig,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            samples_per_genre: DEFAULT_SAMPLES_PER_GENRE,
            split_seed: 42,
            trainer: TrainerConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: TrainedModelBundle,
    pub history: TrainingHistory,
    pub report: ClassificationReport,
    pub train_size: usize,
    pub test_size: usize,
}

/// Train on synthetic data and evaluate on a held-out split
pub fn train_on_synthetic(options: &TrainingOptions) -> Result<TrainingOutcome> {
    if options.samples_per_genre < 2 {
        return Err(Error::InvalidInput(
            "Need at least 2 samples per genre".to_string(),
        ));
    }
    let dataset = generate_synthetic_data(options.samples_per_genre);
    info!(
        "Dataset: {} samples, {} features",
        dataset.len(),
        crate::features::FEATURE_DIM
    );
    train_on_dataset(&dataset, options)
}

pub fn train_on_dataset(dataset: &Dataset, options: &TrainingOptions) -> Result<TrainingOutcome> {
    if dataset.features.nrows() != dataset.len() {
        return Err(Error::InvalidInput(format!(
            "{} feature rows but {} labels",
            dataset.features.nrows(),
            dataset.len()
        )));
    }
    let encoder = LabelEncoder::fit(&dataset.labels);
    let encoded: Vec<usize> = dataset
        .labels
        .iter()
        .map(|&g| {
            encoder
                .encode(g)
                .ok_or_else(|| Error::InvalidInput(format!("Unencodable label {}", g)))
        })
        .collect::<Result<_>>()?;

    let (train_idx, test_idx) = stratified_split(&encoded, TEST_FRACTION, options.split_seed);
    info!(
        "Training samples: {}, test samples: {}",
        train_idx.len(),
        test_idx.len()
    );

    let train_raw = dataset.features.select(Axis(0), &train_idx);
    let scaler = StandardScaler::fit(&train_raw)?;
    let train_rows = scaler.transform_rows(&train_raw)?;
    let test_rows = scaler.transform_rows(&dataset.features.select(Axis(0), &test_idx))?;
    let train_labels: Vec<usize> = train_idx.iter().map(|&i| encoded[i]).collect();
    let test_labels: Vec<usize> = test_idx.iter().map(|&i| encoded[i]).collect();

    let (network, history) = train(&train_rows, &train_labels, encoder.len(), &options.trainer)?;

    let predicted = trainer::predict_classes(&network, &test_rows);
    let report = ClassificationReport::new(&test_labels, &predicted, &encoder.classes);
    info!(
        "Test accuracy: {:.4} after {} epochs",
        report.accuracy,
        history.epochs_run()
    );

    let bundle = TrainedModelBundle::new(encoder, scaler, network);
    bundle.validate()?;

    Ok(TrainingOutcome {
        bundle,
        history,
        report,
        train_size: train_idx.len(),
        test_size: test_idx.len(),
    })
}

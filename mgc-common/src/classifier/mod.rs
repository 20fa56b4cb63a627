//! Genre classification
//!
//! [`GenreClassifier`] is either backed by a trained network loaded from disk
//! or by the deterministic [`MockClassifier`]. Any failure in the trained path
//! degrades to the mock result instead of surfacing an error.

pub mod bundle;
pub mod mock;
pub mod network;

pub use bundle::{LabelEncoder, StandardScaler, TrainedModelBundle};
pub use mock::MockClassifier;
pub use network::Mlp;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::features::FeatureVector;
use crate::genre::Genre;
use crate::Result;

/// Classifier output
///
/// `probabilities` always holds all ten genres in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenrePrediction {
    pub genre: Genre,
    pub confidence: f64,
    pub probabilities: BTreeMap<Genre, f64>,
}

/// Which strategy is serving predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    Trained,
    Mock,
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierMode::Trained => write!(f, "trained"),
            ClassifierMode::Mock => write!(f, "mock"),
        }
    }
}

/// Network-backed classifier
#[derive(Debug, Clone)]
pub struct TrainedClassifier {
    bundle: TrainedModelBundle,
}

impl TrainedClassifier {
    pub fn new(bundle: TrainedModelBundle) -> Result<Self> {
        bundle.validate()?;
        Ok(Self { bundle })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(TrainedModelBundle::load(path)?)
    }

    pub fn bundle(&self) -> &TrainedModelBundle {
        &self.bundle
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<GenrePrediction> {
        let scaled = self.bundle.scaler.transform(features.values())?;
        let probs = self.bundle.network.predict_proba(scaled.view())?;

        let mut probabilities: BTreeMap<Genre, f64> =
            Genre::ALL.iter().map(|&g| (g, 0.0)).collect();
        for (index, p) in probs.iter().enumerate() {
            if let Some(genre) = self.bundle.label_encoder.decode(index) {
                probabilities.insert(genre, *p);
            }
        }

        let (genre, confidence) = probabilities
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&g, &p)| (g, p))
            .ok_or_else(|| crate::Error::Model("Empty prediction".to_string()))?;

        Ok(GenrePrediction {
            genre,
            confidence,
            probabilities,
        })
    }
}

/// Classification strategy chosen at startup
#[derive(Debug, Clone)]
pub enum GenreClassifier {
    Trained(TrainedClassifier),
    Mock(MockClassifier),
}

impl GenreClassifier {
    /// Load the model at `path`, falling back to mock mode when it is absent
    /// or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(
                "No trained model at {}, using mock predictions",
                path.display()
            );
            return GenreClassifier::Mock(MockClassifier);
        }

        match TrainedClassifier::load(path) {
            Ok(trained) => {
                info!(
                    "Loaded trained model from {} ({} classes)",
                    path.display(),
                    trained.bundle().label_encoder.len()
                );
                GenreClassifier::Trained(trained)
            }
            Err(e) => {
                warn!(
                    "Failed to load model from {}: {}. Using mock predictions",
                    path.display(),
                    e
                );
                GenreClassifier::Mock(MockClassifier)
            }
        }
    }

    pub fn mock() -> Self {
        GenreClassifier::Mock(MockClassifier)
    }

    pub fn mode(&self) -> ClassifierMode {
        match self {
            GenreClassifier::Trained(_) => ClassifierMode::Trained,
            GenreClassifier::Mock(_) => ClassifierMode::Mock,
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> GenrePrediction {
        match self {
            GenreClassifier::Trained(trained) => match trained.predict(features) {
                Ok(prediction) => prediction,
                Err(e) => {
                    warn!("Trained prediction failed: {}. Using mock prediction", e);
                    MockClassifier.predict(features)
                }
            },
            GenreClassifier::Mock(mock) => mock.predict(features),
        }
    }

    /// Prediction biased toward a known genre; always uses the mock strategy
    pub fn predict_for_genre(&self, genre: Genre) -> GenrePrediction {
        MockClassifier.predict_for_genre(genre)
    }
}

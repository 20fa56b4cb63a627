//! # MGC Common Library
//!
//! Domain core shared by the API service and the training utility:
//! - Genre set and stable seeding helpers
//! - Feature extraction (decoding, spectral analysis, tempo)
//! - Genre classification (trained network or deterministic mock)
//! - Song recommendation over the static catalog
//! - Offline training pipeline
//! - Configuration loading

pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod genre;
pub mod recommender;
pub mod seed;
pub mod training;

pub use classifier::{ClassifierMode, GenreClassifier, GenrePrediction};
pub use error::{Error, Result};
pub use features::{FeatureExtractor, FeatureVector, FEATURE_DIM};
pub use genre::Genre;
pub use recommender::{Catalog, Recommendation, SongRecommender};

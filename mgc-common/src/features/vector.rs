//! Fixed-layout 58-dimensional feature vector

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of timbral (MFCC) coefficients summarised
pub const N_MFCC: usize = 20;
/// Number of pitch classes in the chroma summary
pub const N_CHROMA: usize = 12;
/// Total length of a [`FeatureVector`]
pub const FEATURE_DIM: usize = N_MFCC + N_CHROMA + 6 + N_MFCC;

/// Pitch class labels in chroma order
pub const PITCH_CLASSES: [&str; N_CHROMA] =
    ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

// Offsets into the vector. Layout: mfcc means, chroma, six scalars, mfcc stds.
pub const MFCC_MEAN_OFFSET: usize = 0;
pub const CHROMA_OFFSET: usize = MFCC_MEAN_OFFSET + N_MFCC;
pub const SPECTRAL_CENTROID: usize = CHROMA_OFFSET + N_CHROMA;
pub const SPECTRAL_BANDWIDTH: usize = SPECTRAL_CENTROID + 1;
pub const SPECTRAL_ROLLOFF: usize = SPECTRAL_CENTROID + 2;
pub const ZERO_CROSSING_RATE: usize = SPECTRAL_CENTROID + 3;
pub const RMS_ENERGY: usize = SPECTRAL_CENTROID + 4;
pub const TEMPO: usize = SPECTRAL_CENTROID + 5;
pub const MFCC_STD_OFFSET: usize = TEMPO + 1;

/// Names of every slot, positionally aligned with [`FeatureVector::values`]
pub fn feature_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_DIM);
    names.extend((1..=N_MFCC).map(|i| format!("mfcc_{}_mean", i)));
    names.extend(PITCH_CLASSES.iter().map(|note| format!("chroma_{}", note)));
    names.extend(
        [
            "spectral_centroid",
            "spectral_bandwidth",
            "spectral_rolloff",
            "zero_crossing_rate",
            "rms_energy",
            "tempo",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    names.extend((1..=N_MFCC).map(|i| format!("mfcc_{}_std", i)));
    names
}

/// Immutable acoustic summary of one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap raw values; length must be [`FEATURE_DIM`]
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != FEATURE_DIM {
            return Err(Error::InvalidInput(format!(
                "Feature vector must have {} values, got {}",
                FEATURE_DIM,
                values.len()
            )));
        }
        Ok(Self { values })
    }

    /// Caller guarantees `values.len() == FEATURE_DIM`
    pub(crate) fn from_dim_values(values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), FEATURE_DIM);
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn mfcc_means(&self) -> &[f64] {
        &self.values[MFCC_MEAN_OFFSET..MFCC_MEAN_OFFSET + N_MFCC]
    }

    pub fn chroma(&self) -> &[f64] {
        &self.values[CHROMA_OFFSET..CHROMA_OFFSET + N_CHROMA]
    }

    pub fn mfcc_stds(&self) -> &[f64] {
        &self.values[MFCC_STD_OFFSET..MFCC_STD_OFFSET + N_MFCC]
    }

    pub fn tempo(&self) -> f64 {
        self.values[TEMPO]
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        FeatureVector::new(values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.values
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

//! Persisted model bundle: network + feature scaler + label encoder
//!
//! Stored as JSON. Written atomically (temp file in the target directory,
//! then rename) so a crashed training run never leaves a half-written model.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::info;

use super::network::Mlp;
use crate::features::FEATURE_DIM;
use crate::genre::Genre;
use crate::{Error, Result};

/// Bumped whenever the on-disk layout changes incompatibly
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Per-feature standardisation `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `x`; zero-variance columns get scale 1
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InvalidInput("Cannot fit scaler on no rows".to_string()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|sd| if sd > 1e-12 { sd } else { 1.0 });
        Ok(Self { mean, scale })
    }

    /// Identity scaling for `dim` features
    pub fn identity(dim: usize) -> Self {
        Self {
            mean: Array1::zeros(dim),
            scale: Array1::ones(dim),
        }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &[f64]) -> Result<Array1<f64>> {
        if x.len() != self.dim() {
            return Err(Error::Model(format!(
                "Scaler expects {} features, got {}",
                self.dim(),
                x.len()
            )));
        }
        Ok((&ArrayView1::from(x) - &self.mean) / &self.scale)
    }

    /// Scale every row of `x`
    pub fn transform_rows(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.dim() {
            return Err(Error::Model(format!(
                "Scaler expects {} features, got {}",
                self.dim(),
                x.ncols()
            )));
        }
        Ok((x - &self.mean) / &self.scale)
    }
}

/// Maps genres to network output indices, classes sorted by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<Genre>,
}

impl LabelEncoder {
    pub fn fit(labels: &[Genre]) -> Self {
        let mut classes: Vec<Genre> = labels.to_vec();
        classes.sort_by_key(|g| g.as_str());
        classes.dedup();
        Self { classes }
    }

    pub fn encode(&self, genre: Genre) -> Option<usize> {
        self.classes.iter().position(|&g| g == genre)
    }

    pub fn decode(&self, index: usize) -> Option<Genre> {
        self.classes.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Everything a trained classifier needs at inference time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelBundle {
    pub format_version: u32,
    /// Genre list the model was trained against, canonical order
    pub genres: Vec<Genre>,
    pub label_encoder: LabelEncoder,
    pub scaler: StandardScaler,
    pub network: Mlp,
}

impl TrainedModelBundle {
    pub fn new(label_encoder: LabelEncoder, scaler: StandardScaler, network: Mlp) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            genres: Genre::ALL.to_vec(),
            label_encoder,
            scaler,
            network,
        }
    }

    /// Reject bundles that cannot score a [`FeatureVector`](crate::features::FeatureVector)
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(Error::Model(format!(
                "Unsupported bundle format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }
        if self.label_encoder.is_empty() {
            return Err(Error::Model("Label encoder has no classes".to_string()));
        }
        if self.scaler.dim() != FEATURE_DIM || self.scaler.scale.len() != FEATURE_DIM {
            return Err(Error::Model(format!(
                "Scaler has {} features, expected {}",
                self.scaler.dim(),
                FEATURE_DIM
            )));
        }
        self.network.validate()?;
        if self.network.input_dim() != FEATURE_DIM {
            return Err(Error::Model(format!(
                "Network expects {} inputs, expected {}",
                self.network.input_dim(),
                FEATURE_DIM
            )));
        }
        if self.network.output_dim() != self.label_encoder.len() {
            return Err(Error::Model(format!(
                "Network has {} outputs but {} classes",
                self.network.output_dim(),
                self.label_encoder.len()
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let bundle: Self = serde_json::from_slice(&content)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Write atomically, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, self)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!("Model bundle saved to {}", path.display());
        Ok(())
    }
}

//! Feed-forward multilayer perceptron
//!
//! ReLU hidden layers, softmax output. Weights are stored `[[output, input]]`
//! and inputs are batched row-wise, so a layer's forward pass is
//! `x.dot(&w.t()) + b`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `weights[[out, in]]`
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

impl DenseLayer {
    /// Glorot-uniform weights and biases, bound `sqrt(6 / (fan_in + fan_out))`
    pub fn glorot(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Self {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let weights = Array2::from_shape_fn((fan_out, fan_in), |_| rng.gen_range(-bound..bound));
        let biases = Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound));
        Self { weights, biases }
    }

    /// Zero-filled layer of the same shape
    pub fn zeros_like(&self) -> Self {
        Self {
            weights: Array2::zeros(self.weights.raw_dim()),
            biases: Array1::zeros(self.biases.raw_dim()),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.biases.len()
    }

    /// Pre-activation output `x W^T + b` for a batch of rows
    pub fn affine(&self, x: ArrayView2<f64>) -> Array2<f64> {
        x.dot(&self.weights.t()) + &self.biases
    }
}

/// Multilayer perceptron classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    pub layers: Vec<DenseLayer>,
}

impl Mlp {
    /// Randomly initialised network: `input -> hidden... -> output`
    pub fn new(input_dim: usize, hidden: &[usize], output_dim: usize, rng: &mut StdRng) -> Self {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(input_dim);
        sizes.extend_from_slice(hidden);
        sizes.push(output_dim);

        let layers = sizes
            .windows(2)
            .map(|pair| DenseLayer::glorot(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_dim)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_dim)
    }

    /// Check that layer shapes chain
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::Model("Network has no layers".to_string()));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.nrows() != layer.biases.len() {
                return Err(Error::Model(format!(
                    "Layer {}: {} weight rows but {} biases",
                    i,
                    layer.weights.nrows(),
                    layer.biases.len()
                )));
            }
            if layer.input_dim() == 0 {
                return Err(Error::Model(format!("Layer {}: empty weight matrix", i)));
            }
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].output_dim() != pair[1].input_dim() {
                return Err(Error::Model(format!(
                    "Layer {} outputs {} values but layer {} expects {}",
                    i,
                    pair[0].output_dim(),
                    i + 1,
                    pair[1].input_dim()
                )));
            }
        }
        Ok(())
    }

    /// Activations of every layer for a batch, input first, softmax output last
    pub fn forward_activations(&self, x: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_owned());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = layer.affine(activations[i].view());
            if i == last {
                softmax_rows(&mut z);
            } else {
                z.mapv_inplace(|v| v.max(0.0));
            }
            activations.push(z);
        }
        activations
    }

    /// Class probabilities for every row of an (already scaled) batch
    pub fn predict_proba_batch(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.input_dim() {
            return Err(Error::Model(format!(
                "Network expects {} inputs, got {}",
                self.input_dim(),
                x.ncols()
            )));
        }
        let probs = self
            .forward_activations(x)
            .pop()
            .ok_or_else(|| Error::Model("Network has no layers".to_string()))?;
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(Error::Model("Non-finite network output".to_string()));
        }
        Ok(probs)
    }

    /// Class probabilities for one (already scaled) input
    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba_batch(x.insert_axis(Axis(0)))?;
        Ok(probs.row(0).to_owned())
    }
}

/// Numerically stable softmax applied to each row in place
pub fn softmax_rows(z: &mut Array2<f64>) {
    for mut row in z.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let total = row.sum();
        row.mapv_inplace(|v| v / total);
    }
}

/// Index of the largest value in every row
pub fn argmax_rows(x: &Array2<f64>) -> Vec<usize> {
    x.rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map_or(0, |(i, _)| i)
        })
        .collect()
}

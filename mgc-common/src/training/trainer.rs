//! Minibatch Adam training for [`Mlp`]
//!
//! Softmax cross-entropy with L2 penalty, early stopping on held-out
//! accuracy. The best-scoring weights are restored at the end.

use ndarray::{Array2, ArrayView2, Axis, Zip};
use rand::seq::SliceRandom;
use tracing::{debug, info};

use super::split::stratified_split;
use crate::classifier::network::{argmax_rows, DenseLayer, Mlp};
use crate::seed::rng_for_seed;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// L2 penalty
    pub alpha: f64,
    /// `None` uses `min(200, n)`
    pub batch_size: Option<usize>,
    pub max_epochs: usize,
    pub early_stopping: bool,
    pub validation_fraction: f64,
    /// Epochs without improvement before stopping
    pub patience: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![256, 128, 64],
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            alpha: 0.001,
            batch_size: None,
            max_epochs: 500,
            early_stopping: true,
            validation_fraction: 0.1,
            patience: 20,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub loss_curve: Vec<f64>,
    pub validation_scores: Vec<f64>,
    pub best_validation_score: Option<f64>,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn epochs_run(&self) -> usize {
        self.loss_curve.len()
    }
}

fn zeros_like(net: &Mlp) -> Vec<DenseLayer> {
    net.layers.iter().map(DenseLayer::zeros_like).collect()
}

/// Adam optimiser state, one moment pair per parameter
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    m: Vec<DenseLayer>,
    v: Vec<DenseLayer>,
}

impl Adam {
    fn new(net: &Mlp, config: &TrainerConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            step: 0,
            m: zeros_like(net),
            v: zeros_like(net),
        }
    }

    fn update(&mut self, net: &mut Mlp, grads: &[DenseLayer]) {
        self.step += 1;
        let lr = self.learning_rate * (1.0 - self.beta2.powi(self.step)).sqrt()
            / (1.0 - self.beta1.powi(self.step));
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        let apply = |param: &mut f64, &g: &f64, m: &mut f64, v: &mut f64| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *param -= lr * *m / (v.sqrt() + eps);
        };

        for (((layer, grad), m), v) in net
            .layers
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            Zip::from(&mut layer.weights)
                .and(&grad.weights)
                .and(&mut m.weights)
                .and(&mut v.weights)
                .for_each(apply);
            Zip::from(&mut layer.biases)
                .and(&grad.biases)
                .and(&mut m.biases)
                .and(&mut v.biases)
                .for_each(apply);
        }
    }
}

/// Add a minibatch gradient (scaled by `scale`) into `grads`; returns the summed loss
fn backprop(
    net: &Mlp,
    x: ArrayView2<f64>,
    targets: &[usize],
    grads: &mut [DenseLayer],
    scale: f64,
) -> f64 {
    let activations = net.forward_activations(x);
    let output = match activations.last() {
        Some(output) => output,
        None => return 0.0,
    };

    // Softmax cross-entropy gradient: probabilities minus one-hot targets
    let mut delta = output.clone();
    let mut loss = 0.0;
    for (mut row, &target) in delta.axis_iter_mut(Axis(0)).zip(targets) {
        loss -= row[target].max(1e-15).ln();
        row[target] -= 1.0;
    }

    for l in (0..net.layers.len()).rev() {
        let input = &activations[l];
        let grad = &mut grads[l];
        grad.weights.scaled_add(scale, &delta.t().dot(input));
        grad.biases.scaled_add(scale, &delta.sum_axis(Axis(0)));

        if l > 0 {
            let mut upstream = delta.dot(&net.layers[l].weights);
            // ReLU derivative from the layer's own input activations
            Zip::from(&mut upstream).and(input).for_each(|u, &a| {
                if a <= 0.0 {
                    *u = 0.0;
                }
            });
            delta = upstream;
        }
    }
    loss
}

/// Predicted class index for every row
pub fn predict_classes(net: &Mlp, rows: &Array2<f64>) -> Vec<usize> {
    net.forward_activations(rows.view())
        .last()
        .map(argmax_rows)
        .unwrap_or_default()
}

/// Fraction of rows whose argmax matches the label
pub fn score(net: &Mlp, rows: &Array2<f64>, labels: &[usize]) -> f64 {
    if rows.nrows() == 0 {
        return 0.0;
    }
    let correct = predict_classes(net, rows)
        .iter()
        .zip(labels)
        .filter(|(p, y)| p == y)
        .count();
    correct as f64 / rows.nrows() as f64
}

/// Train a fresh network on scaled rows with labels in `0..n_classes`
pub fn train(
    rows: &Array2<f64>,
    labels: &[usize],
    n_classes: usize,
    config: &TrainerConfig,
) -> Result<(Mlp, TrainingHistory)> {
    if rows.nrows() == 0 || rows.ncols() == 0 {
        return Err(Error::InvalidInput("No training rows".to_string()));
    }
    let input_dim = rows.ncols();
    if rows.nrows() != labels.len() {
        return Err(Error::InvalidInput(format!(
            "{} rows but {} labels",
            rows.nrows(),
            labels.len()
        )));
    }
    if labels.iter().any(|&y| y >= n_classes) {
        return Err(Error::InvalidInput("Label out of range".to_string()));
    }

    let mut rng = rng_for_seed(config.seed);
    let mut net = Mlp::new(input_dim, &config.hidden_layers, n_classes, &mut rng);
    let mut adam = Adam::new(&net, config);

    let (mut train_idx, val_idx) = if config.early_stopping {
        stratified_split(labels, config.validation_fraction, config.seed)
    } else {
        ((0..rows.nrows()).collect(), Vec::new())
    };
    let val_rows = rows.select(Axis(0), &val_idx);
    let val_labels: Vec<usize> = val_idx.iter().map(|&i| labels[i]).collect();
    let use_validation = config.early_stopping && !val_idx.is_empty();

    let batch_size = config
        .batch_size
        .unwrap_or(200)
        .clamp(1, train_idx.len().max(1));

    let mut history = TrainingHistory::default();
    let mut best_net = net.clone();
    let mut best_loss = f64::INFINITY;
    let mut stale_epochs = 0;

    info!(
        "Training {}-{:?}-{} network on {} rows ({} validation), batch {}",
        input_dim,
        config.hidden_layers,
        n_classes,
        train_idx.len(),
        val_idx.len(),
        batch_size
    );

    for epoch in 1..=config.max_epochs {
        train_idx.shuffle(&mut rng);
        let mut epoch_loss = 0.0;

        for batch in train_idx.chunks(batch_size) {
            let scale = 1.0 / batch.len() as f64;
            let x = rows.select(Axis(0), batch);
            let targets: Vec<usize> = batch.iter().map(|&i| labels[i]).collect();

            let mut grads = zeros_like(&net);
            let mut batch_loss = backprop(&net, x.view(), &targets, &mut grads, scale);

            let mut penalty = 0.0;
            for (layer, grad) in net.layers.iter().zip(grads.iter_mut()) {
                grad.weights.scaled_add(config.alpha * scale, &layer.weights);
                penalty += layer.weights.iter().map(|w| w * w).sum::<f64>();
            }
            batch_loss += 0.5 * config.alpha * penalty;

            adam.update(&mut net, &grads);
            epoch_loss += batch_loss;
        }

        let loss = epoch_loss / train_idx.len() as f64;
        history.loss_curve.push(loss);

        let improved = if use_validation {
            let val_score = score(&net, &val_rows, &val_labels);
            history.validation_scores.push(val_score);
            debug!("Epoch {}: loss {:.6}, validation {:.4}", epoch, loss, val_score);

            let best = history.best_validation_score.unwrap_or(f64::NEG_INFINITY);
            if val_score > best {
                history.best_validation_score = Some(val_score);
                best_net = net.clone();
            }
            val_score >= best + config.tolerance
        } else {
            debug!("Epoch {}: loss {:.6}", epoch, loss);
            let improved = loss <= best_loss - config.tolerance;
            best_loss = best_loss.min(loss);
            improved
        };

        if improved {
            stale_epochs = 0;
        } else {
            stale_epochs += 1;
        }
        if stale_epochs > config.patience {
            info!(
                "No improvement for {} epochs, stopping at epoch {}",
                config.patience, epoch
            );
            history.stopped_early = true;
            break;
        }
        if epoch % 50 == 0 {
            info!("Epoch {}: loss {:.6}", epoch, loss);
        }
    }

    if use_validation {
        net = best_net;
    }
    Ok((net, history))
}

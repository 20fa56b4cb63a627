//! Deterministic stand-in predictions
//!
//! Used when no trained model is loaded and for the built-in samples, whose
//! genre is already known. The same input always yields the same output.

use rand::Rng;
use rand_distr::{Dirichlet, Distribution};

use super::GenrePrediction;
use crate::features::FeatureVector;
use crate::genre::{Genre, GENRE_COUNT};
use crate::seed::{rng_for_key, rng_for_seed};

/// Concentration of the baseline distribution
const DIRICHLET_ALPHA: [f64; GENRE_COUNT] = [0.5; GENRE_COUNT];
/// Lowest probability assigned to the target genre
pub const TARGET_FLOOR: f64 = 0.65;
/// Width of the target band, so target lies in `[0.65, 0.90)`
pub const TARGET_SPAN: f64 = 0.25;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockClassifier;

impl MockClassifier {
    /// Prediction seeded from the feature sum
    ///
    /// Seed is `|sum * 1000|` truncated and reduced mod 2^32. Non-finite sums
    /// collapse to seed 0.
    pub fn predict(&self, features: &FeatureVector) -> GenrePrediction {
        let seed = ((features.sum() * 1000.0).abs() as u64) % (1u64 << 32);
        let mut rng = rng_for_seed(seed);
        let genre = Genre::ALL[rng.gen_range(0..GENRE_COUNT)];
        self.predict_for_genre(genre)
    }

    /// Prediction that favours `genre`, seeded by the genre name
    pub fn predict_for_genre(&self, genre: Genre) -> GenrePrediction {
        let mut rng = rng_for_key(genre.as_str());
        let baseline: Vec<f64> = match Dirichlet::new(&DIRICHLET_ALPHA[..]) {
            Ok(dist) => dist.sample(&mut rng),
            Err(_) => vec![1.0 / GENRE_COUNT as f64; GENRE_COUNT],
        };
        let target = TARGET_FLOOR + rng.gen::<f64>() * TARGET_SPAN;

        let target_idx = genre.index();
        let others: f64 = baseline
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, p)| p)
            .sum();
        let remaining = 1.0 - target;

        let probabilities = Genre::ALL
            .iter()
            .zip(&baseline)
            .map(|(&g, &p)| {
                let value = if g == genre {
                    target
                } else if others > 0.0 {
                    p * remaining / others
                } else {
                    remaining / (GENRE_COUNT - 1) as f64
                };
                (g, value)
            })
            .collect();

        GenrePrediction {
            genre,
            confidence: target,
            probabilities,
        }
    }
}

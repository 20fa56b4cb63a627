//! Synthetic labelled feature vectors
//!
//! Each genre draws standard-normal vectors from its own RNG (seed
//! `genre_index * 42`) and shifts a few dimensions so the classes are
//! separable. The last slot holds a tempo-like value.

use ndarray::{s, Array2, ArrayViewMut1, Axis};
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::features::FEATURE_DIM;
use crate::genre::Genre;
use crate::seed::rng_for_seed;

pub const DEFAULT_SAMPLES_PER_GENRE: usize = 100;

/// Feature matrix `[[sample, feature]]` with one label per row
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Vec<Genre>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn generate_synthetic_data(samples_per_genre: usize) -> Dataset {
    let mut features = Array2::zeros((samples_per_genre * Genre::ALL.len(), FEATURE_DIM));
    let mut labels = Vec::with_capacity(features.nrows());
    let mut rows = features.axis_iter_mut(Axis(0));
    for genre in Genre::ALL {
        let mut rng = rng_for_seed(genre.index() as u64 * 42);
        for mut row in rows.by_ref().take(samples_per_genre) {
            row.iter_mut().for_each(|v| *v = StandardNormal.sample(&mut rng));
            apply_genre_pattern(genre, &mut row, &mut rng);
            labels.push(genre);
        }
    }
    Dataset { features, labels }
}

fn shift(row: &mut ArrayViewMut1<f64>, range: std::ops::Range<usize>, amount: f64) {
    row.slice_mut(s![range]).mapv_inplace(|v| v + amount);
}

fn apply_genre_pattern(genre: Genre, row: &mut ArrayViewMut1<f64>, rng: &mut StdRng) {
    let (base_tempo, tempo_spread) = match genre {
        Genre::Rock => {
            shift(row, 0..5, 2.0);
            (120.0, 20.0)
        }
        Genre::Classical => {
            shift(row, 10..15, 1.5);
            (80.0, 30.0)
        }
        Genre::Electronic => {
            shift(row, 32..35, 2.0);
            (128.0, 10.0)
        }
        Genre::Jazz => {
            shift(row, 20..32, 1.0);
            (100.0, 40.0)
        }
        Genre::Hiphop => {
            shift(row, 0..10, 1.5);
            (90.0, 15.0)
        }
        Genre::Metal => {
            shift(row, 32..35, 3.0);
            shift(row, 35..36, 2.0);
            (140.0, 30.0)
        }
        Genre::Blues => {
            shift(row, 5..15, 1.0);
            (80.0, 20.0)
        }
        Genre::Country => {
            shift(row, 20..32, 0.8);
            (110.0, 20.0)
        }
        Genre::Pop => {
            shift(row, 32..35, 1.2);
            (120.0, 15.0)
        }
        Genre::Reggae => {
            shift(row, 0..5, 1.5);
            (80.0, 10.0)
        }
    };
    let noise: f64 = StandardNormal.sample(rng);
    if let Some(last) = row.len().checked_sub(1) {
        row[last] = base_tempo + noise * tempo_spread;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        let data = generate_synthetic_data(5);
        assert_eq!(data.len(), 50);
        assert_eq!(data.features.dim(), (50, FEATURE_DIM));
        assert_eq!(data.labels[0], Genre::Rock);
        assert_eq!(data.labels[49], Genre::Reggae);
    }

    #[test]
    fn test_deterministic() {
        let a = generate_synthetic_data(3);
        let b = generate_synthetic_data(3);
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn test_genre_offsets_visible_in_means() {
        let data = generate_synthetic_data(200);
        let mean_of = |genre: Genre, dim: usize| {
            let rows: Vec<f64> = data
                .features
                .rows()
                .into_iter()
                .zip(&data.labels)
                .filter(|(_, g)| **g == genre)
                .map(|(r, _)| r[dim])
                .collect();
            rows.iter().sum::<f64>() / rows.len() as f64
        };
        assert!(mean_of(Genre::Rock, 0) > 1.5);
        assert!(mean_of(Genre::Metal, 33) > 2.5);
        assert!(mean_of(Genre::Jazz, 0).abs() < 0.5);

        let tempo = FEATURE_DIM - 1;
        assert!((mean_of(Genre::Electronic, tempo) - 128.0).abs() < 3.0);
        assert!((mean_of(Genre::Reggae, tempo) - 80.0).abs() < 3.0);
    }
}

//! Similarity-ranked song recommendations from the static catalog
//!
//! The catalog carries no real audio, so every song gets a pseudo-random
//! 58-vector derived from its id. Those vectors, and the feature-less
//! fallback scores, come from the id's stable hash: the same song scores
//! the same way on every run. That determinism is deliberate for the demo.

pub mod catalog;

pub use catalog::{Catalog, SampleFile, Song};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::features::{FeatureVector, FEATURE_DIM};
use crate::genre::Genre;
use crate::seed;

/// Lower edge of the displayed similarity band
pub const SIMILARITY_FLOOR: f64 = 0.70;
/// Upper edge of the displayed similarity band
pub const SIMILARITY_CEIL: f64 = 0.95;

/// How candidates are picked before the final sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSelection {
    /// First `top_k` matches in catalog order, then sorted by score.
    /// Songs beyond position `top_k` are never considered.
    #[default]
    CatalogOrder,
    /// Score every match, keep the best `top_k`
    BestScore,
}

/// A catalog song with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub song: Song,
    pub similarity: f64,
}

/// Recommends catalog songs by cosine similarity
#[derive(Debug, Clone)]
pub struct SongRecommender {
    catalog: Arc<Catalog>,
    song_features: HashMap<String, Vec<f64>>,
    selection: CandidateSelection,
}

impl SongRecommender {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_selection(catalog, CandidateSelection::default())
    }

    pub fn with_selection(catalog: Arc<Catalog>, selection: CandidateSelection) -> Self {
        let song_features = catalog
            .songs()
            .iter()
            .map(|song| {
                let mut rng = seed::rng_for_key(&song.id);
                (song.id.clone(), seed::standard_normal_vec(&mut rng, FEATURE_DIM))
            })
            .collect();

        Self {
            catalog,
            song_features,
            selection,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> CandidateSelection {
        self.selection
    }

    /// Recommendations filtered by a genre name
    ///
    /// `None` or an empty name considers the whole catalog; a name outside
    /// the genre set matches nothing and yields an empty list.
    pub fn get_recommendations(
        &self,
        features: Option<&FeatureVector>,
        genre: Option<&str>,
        top_k: usize,
    ) -> Vec<Recommendation> {
        match genre.filter(|g| !g.is_empty()) {
            None => self.recommend(features, None, top_k),
            Some(name) => match name.parse::<Genre>() {
                Ok(g) => self.recommend(features, Some(g), top_k),
                Err(_) => {
                    debug!(genre = name, "No catalog songs for unknown genre");
                    Vec::new()
                }
            },
        }
    }

    /// Recommendations, sorted by similarity descending
    pub fn recommend(
        &self,
        features: Option<&FeatureVector>,
        genre: Option<Genre>,
        top_k: usize,
    ) -> Vec<Recommendation> {
        let candidates = self
            .catalog
            .songs()
            .iter()
            .filter(|s| genre.map_or(true, |g| s.genre == g));

        let mut recommendations: Vec<Recommendation> = match self.selection {
            CandidateSelection::CatalogOrder => candidates
                .take(top_k)
                .map(|song| self.score(song, features))
                .collect(),
            CandidateSelection::BestScore => {
                candidates.map(|song| self.score(song, features)).collect()
            }
        };

        recommendations.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        recommendations.truncate(top_k);
        recommendations
    }

    fn score(&self, song: &Song, features: Option<&FeatureVector>) -> Recommendation {
        let similarity = match features {
            Some(query) => {
                let cosine = self
                    .song_features
                    .get(&song.id)
                    .map(|v| cosine_similarity(query.values(), v))
                    .unwrap_or(0.0);
                rescale_similarity(cosine)
            }
            None => {
                let mut rng = seed::rng_for_key(&song.id);
                SIMILARITY_FLOOR + rng.gen::<f64>() * (SIMILARITY_CEIL - SIMILARITY_FLOOR)
            }
        };

        Recommendation {
            song: song.clone(),
            similarity: round3(similarity),
        }
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let norm_a = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

/// Map a cosine in [-1, 1] onto [SIMILARITY_FLOOR, SIMILARITY_CEIL]
pub fn rescale_similarity(cosine: f64) -> f64 {
    let unit = (cosine.clamp(-1.0, 1.0) + 1.0) / 2.0;
    SIMILARITY_FLOOR + unit * (SIMILARITY_CEIL - SIMILARITY_FLOOR)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

//! Static song catalog and demo sample table
//!
//! Loaded once at startup from TOML (the embedded `data/catalog.toml` unless
//! an external file is configured) and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::genre::Genre;
use crate::{Error, Result};

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.toml");

/// Catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub genre: Genre,
    /// Display string, e.g. "4:23"
    pub duration: String,
}

/// Demo sample the client can pick instead of uploading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFile {
    pub id: String,
    pub name: String,
    pub genre: Genre,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    songs: Vec<Song>,
    #[serde(default)]
    samples: Vec<SampleFile>,
}

/// Immutable in-memory registry of songs and samples, in file order
#[derive(Debug, Clone)]
pub struct Catalog {
    songs: Vec<Song>,
    samples: Vec<SampleFile>,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_CATALOG)
    }

    /// Load from an external TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            "Loaded catalog from {} ({} songs, {} samples)",
            path.display(),
            catalog.songs.len(),
            catalog.samples.len()
        );
        Ok(catalog)
    }

    /// External file when given, embedded catalog otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid catalog: {}", e)))?;
        Self::new(file.songs, file.samples)
    }

    /// Build a registry, rejecting duplicate ids
    pub fn new(songs: Vec<Song>, samples: Vec<SampleFile>) -> Result<Self> {
        let mut seen = HashSet::new();
        for song in &songs {
            if !seen.insert(song.id.as_str()) {
                return Err(Error::Config(format!("Duplicate song id: {}", song.id)));
            }
        }
        let mut seen = HashSet::new();
        for sample in &samples {
            if !seen.insert(sample.id.as_str()) {
                return Err(Error::Config(format!("Duplicate sample id: {}", sample.id)));
            }
        }
        Ok(Self { songs, samples })
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn samples(&self) -> &[SampleFile] {
        &self.samples
    }

    /// Songs of `genre`, in catalog order
    pub fn songs_in_genre(&self, genre: Genre) -> impl Iterator<Item = &Song> {
        self.songs.iter().filter(move |s| s.genre == genre)
    }

    pub fn sample(&self, id: &str) -> Option<&SampleFile> {
        self.samples.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_shape() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.songs().len(), 30);
        assert_eq!(catalog.samples().len(), 5);
        for genre in Genre::ALL {
            assert_eq!(catalog.songs_in_genre(genre).count(), 3, "{}", genre);
        }
    }

    #[test]
    fn test_embedded_catalog_order() {
        let catalog = Catalog::embedded().unwrap();
        let jazz: Vec<&str> = catalog
            .songs_in_genre(Genre::Jazz)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(jazz, vec!["jazz-1", "jazz-2", "jazz-3"]);
        assert_eq!(catalog.songs()[0].title, "Thunder Road");
    }

    #[test]
    fn test_sample_lookup() {
        let catalog = Catalog::embedded().unwrap();
        let sample = catalog.sample("sample-2").unwrap();
        assert_eq!(sample.genre, Genre::Jazz);
        assert_eq!(sample.name, "Jazz Piano Solo.wav");
        assert!(catalog.sample("sample-99").is_none());
        let ids: Vec<&str> = catalog.samples().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sample-1", "sample-2", "sample-3", "sample-4", "sample-5"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let toml = r#"
            [[songs]]
            id = "a"
            title = "A"
            artist = "X"
            genre = "rock"
            duration = "1:00"

            [[songs]]
            id = "a"
            title = "B"
            artist = "Y"
            genre = "pop"
            duration = "2:00"
        "#;
        assert!(matches!(Catalog::from_toml_str(toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_genre_rejected() {
        let toml = r#"
            [[songs]]
            id = "a"
            title = "A"
            artist = "X"
            genre = "polka"
            duration = "1:00"
        "#;
        assert!(Catalog::from_toml_str(toml).is_err());
    }
}

//! The fixed set of genres the classifier and catalog speak in

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Number of genres in [`Genre::ALL`]
pub const GENRE_COUNT: usize = 10;

/// Music genre label
///
/// Declaration order is the canonical order used for probability vectors
/// and for the `probabilities` map in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Rock,
    Pop,
    Jazz,
    Classical,
    Hiphop,
    Electronic,
    Blues,
    Country,
    Metal,
    Reggae,
}

impl Genre {
    /// All genres in canonical order
    pub const ALL: [Genre; GENRE_COUNT] = [
        Genre::Rock,
        Genre::Pop,
        Genre::Jazz,
        Genre::Classical,
        Genre::Hiphop,
        Genre::Electronic,
        Genre::Blues,
        Genre::Country,
        Genre::Metal,
        Genre::Reggae,
    ];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Rock => "rock",
            Genre::Pop => "pop",
            Genre::Jazz => "jazz",
            Genre::Classical => "classical",
            Genre::Hiphop => "hiphop",
            Genre::Electronic => "electronic",
            Genre::Blues => "blues",
            Genre::Country => "country",
            Genre::Metal => "metal",
            Genre::Reggae => "reggae",
        }
    }

    /// Position in [`Genre::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Genre> {
        Genre::ALL.get(index).copied()
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Genre::ALL
            .iter()
            .find(|g| g.as_str() == s)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("Unknown genre: {}", s)))
    }
}

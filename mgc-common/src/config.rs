//! Configuration loading and path resolution
//!
//! Priority order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The binaries handle 1 and 2 with clap; this module owns 3 and 4.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::recommender::CandidateSelection;
use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MGC_CONFIG";

/// File name of the trained bundle inside the model directory
pub const MODEL_FILE_NAME: &str = "genre_classifier.json";

/// Feature extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Analysis sample rate in Hz
    pub sample_rate: u32,
    /// Seconds of audio analysed from the start of each file
    pub max_duration_secs: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            max_duration_secs: 30.0,
        }
    }
}

/// Recommendation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Recommendations returned per prediction
    pub top_k: usize,
    /// How candidates are chosen before sorting
    pub selection: CandidateSelection,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            selection: CandidateSelection::default(),
        }
    }
}

/// Full service configuration as read from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Trained bundle location; `None` means [`default_model_path`]
    pub model_path: Option<PathBuf>,
    /// External catalog TOML; `None` means the embedded catalog
    pub catalog_path: Option<PathBuf>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    pub extractor: ExtractorConfig,
    pub recommender: RecommenderConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: None,
            catalog_path: None,
            max_upload_bytes: 50 * 1024 * 1024,
            extractor: ExtractorConfig::default(),
            recommender: RecommenderConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Model path after defaulting
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(default_model_path)
    }

    /// Reject values the components cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.extractor.sample_rate == 0 {
            return Err(Error::Config("extractor.sample_rate must be positive".to_string()));
        }
        let duration = self.extractor.max_duration_secs;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::Config(
                "extractor.max_duration_secs must be positive".to_string(),
            ));
        }
        if self.recommender.top_k == 0 {
            return Err(Error::Config("recommender.top_k must be at least 1".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

/// Parse a TOML config file
pub fn load_config_file(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate the config file: CLI argument, then `MGC_CONFIG`, then the platform default
///
/// Returns `None` when nothing was given and the default file does not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Load the resolved config file, or defaults when there is none
///
/// An explicitly named file that cannot be read is an error.
pub fn load_service_config(cli_arg: Option<&Path>) -> Result<ServiceConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config_file(&path)
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(ServiceConfig::default())
        }
    }
}

/// `<config dir>/mgc/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mgc").join("config.toml"))
}

/// `<local data dir>/mgc/models/genre_classifier.json`
pub fn default_model_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mgc"))
        .unwrap_or_else(|| PathBuf::from("./mgc_data"))
        .join("models")
        .join(MODEL_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8000);
        assert_eq!(config.extractor.sample_rate, 22050);
        assert_eq!(config.extractor.max_duration_secs, 30.0);
        assert_eq!(config.recommender.top_k, 3);
        assert_eq!(config.recommender.selection, CandidateSelection::CatalogOrder);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "port = 9001\n[recommender]\nselection = \"best_score\"\n",
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.recommender.top_k, 3);
        assert_eq!(config.recommender.selection, CandidateSelection::BestScore);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = load_service_config(Some(Path::new("/nonexistent/mgc.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.recommender.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.extractor.sample_rate = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.extractor.max_duration_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_path_defaults_to_data_dir() {
        let config = ServiceConfig::default();
        assert!(config.resolved_model_path().ends_with("models/genre_classifier.json"));

        let config = ServiceConfig {
            model_path: Some(PathBuf::from("/tmp/model.json")),
            ..Default::default()
        };
        assert_eq!(config.resolved_model_path(), PathBuf::from("/tmp/model.json"));
    }
}

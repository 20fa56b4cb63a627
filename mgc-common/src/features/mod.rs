//! Audio feature extraction
//!
//! [`FeatureExtractor::extract`] never fails: when the audio backend is not
//! compiled in, or decoding/analysis fails, it returns the fixed mock vector
//! instead. Callers cannot tell the two apart.

#[cfg(feature = "audio-backend")]
pub mod analysis;
#[cfg(feature = "audio-backend")]
pub mod decoder;
#[cfg(feature = "audio-backend")]
pub mod spectral;
#[cfg(feature = "audio-backend")]
pub mod tempo;
pub mod vector;

pub use vector::{feature_names, FeatureVector, FEATURE_DIM};

use std::path::Path;

use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::seed;
use crate::Result;

/// Seed of the mock feature vector
pub const MOCK_FEATURE_SEED: u64 = 42;

/// Whether real audio analysis is compiled in
pub const fn backend_available() -> bool {
    cfg!(feature = "audio-backend")
}

/// Loads audio and summarises it into a [`FeatureVector`]
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    /// Analysis sample rate in Hz
    sample_rate: u32,
    /// Only the first `max_duration_secs` of a file are analysed
    max_duration_secs: f64,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(22050, 30.0)
    }
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32, max_duration_secs: f64) -> Self {
        Self {
            sample_rate,
            max_duration_secs,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.sample_rate, config.max_duration_secs)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_duration_secs(&self) -> f64 {
        self.max_duration_secs
    }

    /// Feature vector for the audio file at `path`, or the mock vector
    pub fn extract(&self, path: &Path) -> FeatureVector {
        if !backend_available() {
            debug!("Audio backend not compiled in, using mock features");
            return mock_features();
        }

        match self.try_extract(path) {
            Ok(features) => features,
            Err(e) => {
                warn!(path = %path.display(), "Error extracting features: {}", e);
                mock_features()
            }
        }
    }

    /// Like [`extract`](Self::extract) but surfaces the failure
    #[cfg(feature = "audio-backend")]
    pub fn try_extract(&self, path: &Path) -> Result<FeatureVector> {
        let audio = decoder::load_mono(path, self.sample_rate, self.max_duration_secs)?;
        debug!(
            path = %path.display(),
            duration_seconds = audio.duration_seconds(),
            "Analysing audio"
        );
        self.extract_samples(&audio.samples)
    }

    #[cfg(not(feature = "audio-backend"))]
    pub fn try_extract(&self, _path: &Path) -> Result<FeatureVector> {
        Err(crate::Error::Analysis(
            "Audio backend not compiled in".to_string(),
        ))
    }

    /// Summarise mono samples already at the analysis rate
    #[cfg(feature = "audio-backend")]
    pub fn extract_samples(&self, samples: &[f32]) -> Result<FeatureVector> {
        let max_len = (self.max_duration_secs * self.sample_rate as f64) as usize;
        let clip = &samples[..samples.len().min(max_len)];
        analysis::summarize(clip, self.sample_rate)
    }
}

/// The fixed fallback vector: 58 standard-normal draws under seed 42
pub fn mock_features() -> FeatureVector {
    let mut rng = seed::rng_for_seed(MOCK_FEATURE_SEED);
    FeatureVector::from_dim_values(seed::standard_normal_vec(&mut rng, FEATURE_DIM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_features_are_deterministic() {
        let a = mock_features();
        let b = mock_features();
        assert_eq!(a, b);
        assert_eq!(a.values().len(), FEATURE_DIM);
        assert!(a.is_finite());
    }

    #[test]
    fn test_missing_file_falls_back_to_mock() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(Path::new("/nonexistent/clip.wav"));
        assert_eq!(features, mock_features());
    }

    #[test]
    fn test_garbage_file_falls_back_to_mock() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("upload.wav");
        std::fs::write(&path, b"RIFF but not really").unwrap();
        let features = FeatureExtractor::default().extract(&path);
        assert_eq!(features, mock_features());
    }

    /// Two seconds of a 330 Hz tone, 16-bit mono at 22050 Hz
    fn write_tone(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..22050 * 2 {
            let t = i as f32 / 22050.0;
            let s = 0.3 * (2.0 * std::f32::consts::PI * 330.0 * t).sin();
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[cfg(feature = "audio-backend")]
    #[test]
    fn test_extract_real_wav() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path);

        let extractor = FeatureExtractor::default();
        let features = extractor.try_extract(&path).unwrap();
        assert_eq!(features.values().len(), FEATURE_DIM);
        assert_ne!(features, mock_features());
        assert_eq!(feature_names().len(), features.values().len());
    }

    #[cfg(not(feature = "audio-backend"))]
    #[test]
    fn test_without_backend_valid_wav_yields_mock() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path);

        let extractor = FeatureExtractor::default();
        assert!(!backend_available());
        assert!(extractor.try_extract(&path).is_err());
        assert_eq!(extractor.extract(&path), mock_features());
    }

    #[cfg(feature = "audio-backend")]
    #[test]
    fn test_extract_samples_truncates() {
        let extractor = FeatureExtractor::new(8000, 0.5);
        let long: Vec<f32> = (0..8000 * 3).map(|i| ((i % 40) as f32 / 40.0) - 0.5).collect();
        let short = &long[..4000];
        assert_eq!(
            extractor.extract_samples(&long).unwrap(),
            extractor.extract_samples(short).unwrap()
        );
    }
}

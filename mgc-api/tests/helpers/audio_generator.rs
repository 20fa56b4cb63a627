//! Audio Test Fixture Generator
//!
//! Utilities for generating WAV uploads

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequency in Hz
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            sample_rate: 44100,
            channels: 2,
            frequency: 440.0,
        }
    }
}

/// Generate a test WAV file: a sine tone with a short click every half second
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    let click_every = (config.sample_rate / 2) as usize;

    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let mut value = 0.3 * (2.0 * std::f32::consts::PI * config.frequency * t).sin();
        if i % click_every < 64 {
            value += 0.5;
        }
        let sample = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// WAV file contents as bytes
pub fn wav_bytes(config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let dir = tempfile::TempDir::new()?;
    let path = generate_test_wav(&dir.path().join("fixture.wav"), config)?;
    Ok(std::fs::read(path)?)
}

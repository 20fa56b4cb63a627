//! Reduce a mono signal to the 58-value summary

use ndarray::{Array1, Array2, Axis};

use super::spectral::{self, FrameConfig};
use super::tempo;
use super::vector::{FeatureVector, FEATURE_DIM, N_CHROMA, N_MFCC};
use crate::{Error, Result};

const N_MELS: usize = 128;
const TOP_DB: f64 = 80.0;
const ROLL_PERCENT: f64 = 0.85;

/// Compute the feature summary of `samples` (mono, `sample_rate` Hz)
pub fn summarize(samples: &[f32], sample_rate: u32) -> Result<FeatureVector> {
    if samples.is_empty() {
        return Err(Error::Analysis("Empty sample buffer".to_string()));
    }
    if sample_rate == 0 {
        return Err(Error::Analysis("Sample rate must be positive".to_string()));
    }

    let cfg = FrameConfig::new(sample_rate);
    let magnitude = spectral::stft_magnitude(samples, &cfg);
    let power = spectral::power(&magnitude);
    let freqs = spectral::fft_frequencies(sample_rate, cfg.n_fft);

    let mel_fb = spectral::mel_filterbank(sample_rate, cfg.n_fft, N_MELS);
    let log_mel = spectral::power_to_db(&spectral::apply_filterbank(&power, &mel_fb), TOP_DB);
    let mfcc = spectral::mfcc_from_log_mel(&log_mel, N_MFCC);

    let chroma_fb = spectral::chroma_filterbank(sample_rate, cfg.n_fft, N_CHROMA);
    let chroma = spectral::chroma_from_power(&power, &chroma_fb);

    let centroid = spectral::spectral_centroid(&magnitude, &freqs);
    let bandwidth = spectral::spectral_bandwidth(&magnitude, &freqs, &centroid);
    let rolloff = spectral::spectral_rolloff(&magnitude, &freqs, ROLL_PERCENT);
    let zcr = spectral::zero_crossing_rate(samples, cfg.n_fft, cfg.hop_length);
    let rms = spectral::rms(samples, cfg.n_fft, cfg.hop_length);

    let onset_env = tempo::onset_strength(&log_mel);
    let bpm = tempo::estimate_tempo(&onset_env, sample_rate, cfg.hop_length);

    let mut values = Vec::with_capacity(FEATURE_DIM);
    values.extend(column_means(&mfcc)?.iter().copied());
    values.extend(column_means(&chroma)?.iter().copied());
    values.push(mean(&centroid));
    values.push(mean(&bandwidth));
    values.push(mean(&rolloff));
    values.push(mean(&zcr));
    values.push(mean(&rms));
    values.push(bpm);
    values.extend(mfcc.std_axis(Axis(0), 0.0).iter().copied());

    let features = FeatureVector::new(values)?;
    if !features.is_finite() {
        return Err(Error::Analysis("Non-finite feature value".to_string()));
    }
    Ok(features)
}

fn mean(values: &Array1<f64>) -> f64 {
    values.mean().unwrap_or(0.0)
}

/// Per-coefficient mean over frames
fn column_means(matrix: &Array2<f64>) -> Result<Array1<f64>> {
    matrix
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::Analysis("No analysis frames".to_string()))
}

//! Onset-envelope tempo estimation

use ndarray::Array2;

/// Tempo search range in BPM
pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 300.0;

/// Centre of the log-normal tempo prior
const PRIOR_BPM: f64 = 120.0;
/// Width of the prior in octaves
const PRIOR_STD_OCTAVES: f64 = 1.0;

/// Onset strength per frame: mean positive first difference of a log-mel spectrogram
pub fn onset_strength(log_mel: &Array2<f64>) -> Vec<f64> {
    let n_frames = log_mel.nrows();
    if n_frames < 2 {
        return Vec::new();
    }
    let n_bands = log_mel.ncols().max(1) as f64;
    let mut env = Vec::with_capacity(n_frames);
    env.push(0.0);
    for t in 1..n_frames {
        let flux = (&log_mel.row(t) - &log_mel.row(t - 1)).mapv(|d| d.max(0.0)).sum();
        env.push(flux / n_bands);
    }
    env
}

/// Single global tempo estimate in BPM, 0.0 when no periodicity is found
///
/// Autocorrelates the onset envelope and picks the lag maximising
/// `ln(1 + 1e6 * ac) + log_prior(bpm)`.
pub fn estimate_tempo(onset_env: &[f64], sample_rate: u32, hop_length: usize) -> f64 {
    if onset_env.len() < 4 || sample_rate == 0 || hop_length == 0 {
        return 0.0;
    }
    let frame_rate = sample_rate as f64 / hop_length as f64;

    // Remove DC so constant envelopes produce no peak
    let mean = onset_env.iter().sum::<f64>() / onset_env.len() as f64;
    let centred: Vec<f64> = onset_env.iter().map(|v| v - mean).collect();

    let zero_lag: f64 = centred.iter().map(|v| v * v).sum();
    if zero_lag <= 1e-12 {
        return 0.0;
    }

    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).ceil() as usize).min(centred.len() - 1);

    let mut best: Option<(f64, usize)> = None;
    for lag in min_lag..=max_lag {
        let ac: f64 = centred[..centred.len() - lag]
            .iter()
            .zip(&centred[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / zero_lag;
        if ac <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f64;
        let log_prior = -0.5 * ((bpm.log2() - PRIOR_BPM.log2()) / PRIOR_STD_OCTAVES).powi(2);
        let score = (1e6 * ac).ln_1p() + log_prior;
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, lag));
        }
    }

    match best {
        Some((_, lag)) => 60.0 * frame_rate / lag as f64,
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Envelope with an impulse every `period` frames
    fn click_envelope(period: usize, len: usize) -> Vec<f64> {
        (0..len).map(|i| if i % period == 0 { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn test_finds_periodic_clicks() {
        // 22050 / 512 = 43.07 frames/s; period 21 frames -> ~123 BPM
        let env = click_envelope(21, 1300);
        let bpm = estimate_tempo(&env, 22050, 512);
        let expected = 60.0 * 22050.0 / 512.0 / 21.0;
        assert!((bpm - expected).abs() < 1.0, "bpm {} expected {}", bpm, expected);
    }

    #[test]
    fn test_flat_envelope_has_no_tempo() {
        assert_eq!(estimate_tempo(&vec![0.5; 500], 22050, 512), 0.0);
        assert_eq!(estimate_tempo(&[], 22050, 512), 0.0);
    }

    #[test]
    fn test_estimate_within_search_range() {
        let env = click_envelope(7, 2000);
        let bpm = estimate_tempo(&env, 22050, 512);
        assert!(bpm >= MIN_BPM && bpm <= MAX_BPM, "bpm {}", bpm);
    }

    #[test]
    fn test_onset_strength_positive_flux_only() {
        let log_mel = array![[0.0, 0.0], [2.0, -2.0], [1.0, 1.0]];
        let env = onset_strength(&log_mel);
        assert_eq!(env, vec![0.0, 1.0, 1.5]);
    }
}

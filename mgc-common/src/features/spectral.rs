//! Short-time spectral analysis
//!
//! All matrices are frame-major `Array2`s: `matrix[[frame, bin]]`. Filterbanks
//! are `[[band, bin]]`, so projecting a spectrogram is `spec.dot(&fb.t())`.
//! Conventions follow the usual music-information-retrieval defaults:
//! centred frames with reflect padding, periodic Hann window, Slaney mel
//! scale with area-normalised triangles, orthonormal DCT-II for MFCCs.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Frame geometry shared by every spectral feature
#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
}

impl FrameConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            n_fft: 2048,
            hop_length: 512,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }
}

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
}

/// Pad both ends by `pad` samples, mirroring around the edge samples
///
/// Falls back to zero padding when the signal is too short to mirror.
fn reflect_pad(y: &[f32], pad: usize) -> Vec<f64> {
    let n = y.len();
    let mut out = Vec::with_capacity(n + 2 * pad);
    if n > pad {
        out.extend((1..=pad).rev().map(|i| y[i] as f64));
        out.extend(y.iter().map(|&s| s as f64));
        out.extend((0..pad).map(|i| y[n - 2 - i] as f64));
    } else {
        out.extend(std::iter::repeat(0.0).take(pad));
        out.extend(y.iter().map(|&s| s as f64));
        out.extend(std::iter::repeat(0.0).take(pad));
    }
    out
}

/// Number of centred frames for a signal of `len` samples
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    1 + len / hop_length
}

/// Magnitude STFT, `|X[[frame, bin]]|`
pub fn stft_magnitude(y: &[f32], cfg: &FrameConfig) -> Array2<f64> {
    let n_fft = cfg.n_fft;
    let padded = reflect_pad(y, n_fft / 2);
    let window = hann_window(n_fft);
    let n_frames = frame_count(y.len(), cfg.hop_length);
    let n_bins = cfg.n_bins();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];

    let mut frames = Array2::zeros((n_frames, n_bins));
    for (t, mut row) in frames.axis_iter_mut(Axis(0)).enumerate() {
        let start = t * cfg.hop_length;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let s = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * window[i], 0.0);
        }
        fft.process(&mut buffer);
        for (out, c) in row.iter_mut().zip(&buffer[..n_bins]) {
            *out = c.norm();
        }
    }
    frames
}

/// Element-wise square of a magnitude spectrogram
pub fn power(magnitude: &Array2<f64>) -> Array2<f64> {
    magnitude.mapv(|m| m * m)
}

/// Centre frequency of every FFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Array1<f64> {
    Array1::from_shape_fn(n_fft / 2 + 1, |k| k as f64 * sample_rate as f64 / n_fft as f64)
}

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank, `fb[[mel, bin]]`
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f64> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);
    let mel_max = hz_to_mel(sample_rate as f64 / 2.0);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    Array2::from_shape_fn((n_mels, fft_freqs.len()), |(m, b)| {
        let (lo, centre, hi) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let f = fft_freqs[b];
        let lower = (f - lo) / (centre - lo).max(1e-12);
        let upper = (hi - f) / (hi - centre).max(1e-12);
        lower.min(upper).max(0.0) * 2.0 / (hi - lo).max(1e-12)
    })
}

/// Project a power spectrogram onto a filterbank, `out[[frame, band]]`
pub fn apply_filterbank(power_spec: &Array2<f64>, fb: &Array2<f64>) -> Array2<f64> {
    power_spec.dot(&fb.t())
}

/// Power to decibels (ref 1.0, floor 1e-10), clipped to `top_db` below the global peak
pub fn power_to_db(spec: &Array2<f64>, top_db: f64) -> Array2<f64> {
    let mut db = spec.mapv(|p| 10.0 * p.max(1e-10).log10());
    let floor = db.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)) - top_db;
    db.mapv_inplace(|v| v.max(floor));
    db
}

/// Orthonormal DCT-II basis, `basis[[k, i]]` for the first `n_out` coefficients
pub fn dct_basis(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (PI / n * (i as f64 + 0.5) * k as f64).cos()
    })
}

/// MFCCs per frame from a log-mel spectrogram
pub fn mfcc_from_log_mel(log_mel: &Array2<f64>, n_mfcc: usize) -> Array2<f64> {
    log_mel.dot(&dct_basis(n_mfcc, log_mel.ncols()).t())
}

/// Chroma filterbank, `fb[[pitch_class, bin]]`, starting at C
///
/// Gaussian bumps around each pitch class, L2-normalised per bin, weighted
/// by a Gaussian over octaves centred on octave 5 (width 2).
pub fn chroma_filterbank(sample_rate: u32, n_fft: usize, n_chroma: usize) -> Array2<f64> {
    let n_bins = n_fft / 2 + 1;
    let nc = n_chroma as f64;
    let a0 = 440.0 / 16.0;

    // Fractional chroma bin for every FFT bin above DC
    let mut frqbins: Vec<f64> = (1..n_fft)
        .map(|i| nc * (i as f64 * sample_rate as f64 / n_fft as f64 / a0).log2())
        .collect();
    let dc = frqbins[0] - 1.5 * nc;
    frqbins.insert(0, dc);

    let widths: Vec<f64> = (0..frqbins.len())
        .map(|i| {
            if i + 1 < frqbins.len() {
                (frqbins[i + 1] - frqbins[i]).max(1.0)
            } else {
                1.0
            }
        })
        .collect();

    let half = (nc / 2.0).round();
    let mut wts = Array2::from_shape_fn((n_chroma, n_bins), |(c, b)| {
        let d = (frqbins[b] - c as f64 + half + 10.0 * nc).rem_euclid(nc) - half;
        (-0.5 * (2.0 * d / widths[b]).powi(2)).exp()
    });

    for (b, mut column) in wts.axis_iter_mut(Axis(1)).enumerate() {
        let norm = column.dot(&column).sqrt().max(1e-10);
        let octave = frqbins[b] / nc;
        let weight = (-0.5 * ((octave - 5.0) / 2.0).powi(2)).exp();
        column.mapv_inplace(|w| w / norm * weight);
    }

    // Rows are A-based; rotate so row 0 is C
    let shift = 3 * (n_chroma / 12);
    Array2::from_shape_fn((n_chroma, n_bins), |(c, b)| {
        wts[[(c + shift) % n_chroma, b]]
    })
}

/// Chromagram from a power spectrogram, each frame scaled so its peak is 1
pub fn chroma_from_power(power_spec: &Array2<f64>, fb: &Array2<f64>) -> Array2<f64> {
    let mut chroma = apply_filterbank(power_spec, fb);
    for mut frame in chroma.axis_iter_mut(Axis(0)) {
        let peak = frame.fold(0.0f64, |acc, &v| acc.max(v));
        if peak > 1e-10 {
            frame.mapv_inplace(|v| v / peak);
        }
    }
    chroma
}

/// Magnitude-weighted mean frequency per frame
pub fn spectral_centroid(magnitude: &Array2<f64>, freqs: &Array1<f64>) -> Array1<f64> {
    let weighted = magnitude.dot(freqs);
    let totals = magnitude.sum_axis(Axis(1));
    Zip::from(&weighted)
        .and(&totals)
        .map_collect(|&w, &total| if total <= 1e-10 { 0.0 } else { w / total })
}

/// Second-order spectral spread around the centroid per frame
pub fn spectral_bandwidth(
    magnitude: &Array2<f64>,
    freqs: &Array1<f64>,
    centroid: &Array1<f64>,
) -> Array1<f64> {
    Zip::from(magnitude.rows())
        .and(centroid)
        .map_collect(|frame, &c| {
            let total = frame.sum();
            if total <= 1e-10 {
                return 0.0;
            }
            let spread = freqs.mapv(|f| (f - c).powi(2));
            (frame.dot(&spread) / total).sqrt()
        })
}

/// Lowest frequency below which `roll_percent` of the frame's magnitude lies
pub fn spectral_rolloff(magnitude: &Array2<f64>, freqs: &Array1<f64>, roll_percent: f64) -> Array1<f64> {
    let last = freqs.last().copied().unwrap_or(0.0);
    magnitude
        .rows()
        .into_iter()
        .map(|frame| {
            let total = frame.sum();
            if total <= 1e-10 {
                return 0.0;
            }
            let threshold = roll_percent * total;
            let mut cumulative = 0.0;
            for (m, f) in frame.iter().zip(freqs) {
                cumulative += m;
                if cumulative >= threshold {
                    return *f;
                }
            }
            last
        })
        .collect()
}

/// Centred frames of `frame_length` samples every `hop_length`, `[[frame, sample]]`
///
/// Out-of-range samples repeat the edge value when `edge` is set, zero otherwise.
fn centred_frames(y: &[f32], frame_length: usize, hop_length: usize, edge: bool) -> Array2<f64> {
    let pad = frame_length as isize / 2;
    let n_frames = frame_count(y.len(), hop_length);
    let first = y.first().copied().unwrap_or(0.0) as f64;
    let last = y.last().copied().unwrap_or(0.0) as f64;

    Array2::from_shape_fn((n_frames, frame_length), |(t, i)| {
        let idx = (t * hop_length) as isize - pad + i as isize;
        if idx < 0 {
            if edge { first } else { 0.0 }
        } else if idx as usize >= y.len() {
            if edge { last } else { 0.0 }
        } else {
            y[idx as usize] as f64
        }
    })
}

/// Fraction of sign changes per frame (zero counts as positive)
pub fn zero_crossing_rate(y: &[f32], frame_length: usize, hop_length: usize) -> Array1<f64> {
    centred_frames(y, frame_length, hop_length, true)
        .rows()
        .into_iter()
        .map(|frame| {
            let crossings = frame
                .iter()
                .zip(frame.iter().skip(1))
                .filter(|&(&a, &b)| (a < 0.0) != (b < 0.0))
                .count();
            crossings as f64 / frame_length as f64
        })
        .collect()
}

/// Root-mean-square energy per frame
pub fn rms(y: &[f32], frame_length: usize, hop_length: usize) -> Array1<f64> {
    centred_frames(y, frame_length, hop_length, false)
        .rows()
        .into_iter()
        .map(|frame| (frame.dot(&frame) / frame_length as f64).sqrt())
        .collect()
}

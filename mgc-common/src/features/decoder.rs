//! Audio decoding to mono PCM at the analysis rate
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, FLAC, OGG, AAC, ...)
//! and rubato for sample-rate conversion.

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::debug;

use crate::{Error, Result};

/// Mono PCM ready for analysis
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples, range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode `path` to mono, keep at most `max_duration_secs`, resample to `target_rate`
pub fn load_mono(path: &Path, target_rate: u32, max_duration_secs: f64) -> Result<DecodedAudio> {
    debug!(path = %path.display(), target_rate, "Decoding audio file");

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found in file".to_string()))?;

    let track_id = track.id;
    let native_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("Sample rate unknown".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

    let max_native_samples = (max_duration_secs * native_rate as f64).ceil() as usize;
    let mut samples: Vec<f32> = Vec::new();

    while samples.len() < max_native_samples {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(format!("Error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => samples.extend(mix_to_mono(&decoded)),
            // Corrupt packet: skip it, the rest of the stream may be fine
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(Error::Decode(format!("Failed to decode packet: {}", e))),
        }
    }

    samples.truncate(max_native_samples);

    debug!(
        native_rate,
        native_samples = samples.len(),
        "Audio decoding complete"
    );

    let samples = if native_rate != target_rate {
        resample_mono(samples, native_rate, target_rate)?
    } else {
        samples
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
    })
}

fn mix_to_mono(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => average_channels(buf),
        AudioBufferRef::F64(buf) => average_channels(buf),
        AudioBufferRef::U8(buf) => average_channels(buf),
        AudioBufferRef::U16(buf) => average_channels(buf),
        AudioBufferRef::U24(buf) => average_channels(buf),
        AudioBufferRef::U32(buf) => average_channels(buf),
        AudioBufferRef::S8(buf) => average_channels(buf),
        AudioBufferRef::S16(buf) => average_channels(buf),
        AudioBufferRef::S24(buf) => average_channels(buf),
        AudioBufferRef::S32(buf) => average_channels(buf),
    }
}

fn average_channels<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    if num_channels == 0 {
        return Vec::new();
    }

    let mut mono = vec![0.0f32; num_frames];
    for ch in 0..num_channels {
        for (out, &s) in mono.iter_mut().zip(buf.chan(ch).iter()) {
            *out += f32::from_sample(s);
        }
    }
    let scale = 1.0 / num_channels as f32;
    mono.iter_mut().for_each(|s| *s *= scale);
    mono
}

/// Sinc resampling of a mono signal in a single pass
pub fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let num_frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, num_frames, 1)
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

    let input = vec![samples];
    let output = resampler
        .process(&input, None)
        .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

    debug!(
        "Resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        num_frames,
        source_rate,
        output[0].len(),
        target_rate
    );

    Ok(output.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tone(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (seconds * sample_rate as f32) as usize;
        for i in 0..total {
            let t = i as f32 / sample_rate as f32;
            let s = (0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_mono_native_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 22050, 1, 1.0);

        let audio = load_mono(&path, 22050, 30.0).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 22050);
        let peak = audio.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.3).abs() < 0.01, "peak {}", peak);
    }

    #[test]
    fn test_load_mono_truncates_to_max_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.wav");
        write_tone(&path, 22050, 2, 3.0);

        let audio = load_mono(&path, 22050, 1.5).unwrap();
        assert_eq!(audio.samples.len(), 33075);
    }

    #[test]
    fn test_load_mono_resamples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hi.wav");
        write_tone(&path, 44100, 2, 1.0);

        let audio = load_mono(&path, 22050, 30.0).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        let expected = 22050.0;
        let got = audio.samples.len() as f64;
        assert!((got - expected).abs() / expected < 0.05, "got {} samples", got);
    }

    #[test]
    fn test_load_mono_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(load_mono(&path, 22050, 30.0).is_err());
    }

    #[test]
    fn test_load_mono_missing_file() {
        let result = load_mono(Path::new("/nonexistent/file.wav"), 22050, 30.0);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}

//! Intermediate WAV reading
//!
//! Integer PCM is scaled to f32 in [-1.0, 1.0]; multi-channel data is averaged
//! to mono.

use super::downmix;
use crate::error::DecodeError;
use crate::types::Waveform;
use hound::{SampleFormat, WavReader};
use std::path::Path;

/// Read a WAV file into a mono waveform
pub fn read_wav_mono(path: &Path) -> Result<Waveform, DecodeError> {
    let wav_error = |source| DecodeError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();

    if spec.sample_rate == 0 {
        return Err(DecodeError::InvalidSampleRate {
            path: path.to_path_buf(),
            sample_rate: 0,
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    let samples = downmix(&interleaved, spec.channels as usize);

    tracing::trace!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        samples = samples.len(),
        "Read intermediate WAV"
    );

    Ok(Waveform::new(spec.sample_rate, samples))
}

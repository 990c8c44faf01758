//! Audio decoding
//!
//! [`Decoder`] is the seam between the pipeline and whatever turns a compressed
//! file into mono samples. Two implementations:
//! - [`FfmpegDecoder`]: shells out to ffmpeg, reads the intermediate WAV
//! - [`SymphoniaDecoder`]: decodes in-process, no external tool needed

pub mod ffmpeg;
pub mod native;
pub mod wav;

pub use ffmpeg::FfmpegDecoder;
pub use native::SymphoniaDecoder;

use crate::error::DecodeError;
use crate::types::Waveform;
use specgen_common::config::{DecoderBackend, DecoderConfig};
use std::path::Path;
use std::sync::Arc;

/// Converts an audio file into a mono waveform
///
/// Implementations must leave no temporary artifacts behind, whether the call
/// succeeds or fails.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError>;
}

/// Build the decoder selected by configuration
pub fn decoder_from_config(config: &DecoderConfig) -> Arc<dyn Decoder> {
    match config.backend {
        DecoderBackend::Ffmpeg => Arc::new(FfmpegDecoder::from_config(config)),
        DecoderBackend::Symphonia => Arc::new(SymphoniaDecoder::new()),
    }
}

/// Average interleaved frames down to one channel
pub(crate) fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

//! In-process decoding with symphonia
//!
//! **Algorithm:**
//! 1. Open file and probe format (extension used as hint)
//! 2. Pick the first track with a known codec
//! 3. Decode all packets to interleaved f32
//! 4. Average channels to mono
//!
//! Corrupt packets are skipped; a stream that cannot be probed, or that yields
//! a fatal codec error, is rejected as invalid audio.

use super::{downmix, Decoder};
use crate::error::DecodeError;
use crate::types::Waveform;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoder backed by symphonia's bundled codecs
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        tracing::debug!(path = %path.display(), "Decoding audio file");

        let invalid = |reason: String| DecodeError::InvalidAudio {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| invalid(format!("probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| invalid("no audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| invalid("sample rate unknown".to_string()))?;

        if sample_rate == 0 {
            return Err(DecodeError::InvalidSampleRate {
                path: path.to_path_buf(),
                sample_rate,
            });
        }

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| invalid(format!("unsupported codec: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(invalid(format!("error reading packet: {}", e))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend(downmix(buffer.samples(), spec.channels.count()));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped_packets += 1;
                    tracing::debug!(path = %path.display(), "Skipping corrupt packet: {}", e);
                }
                Err(e) => return Err(invalid(format!("decode failed: {}", e))),
            }
        }

        tracing::debug!(
            path = %path.display(),
            total_samples = samples.len(),
            skipped_packets,
            duration_seconds = format!("{:.2}", samples.len() as f64 / sample_rate as f64),
            "Audio decoding complete"
        );

        Ok(Waveform::new(sample_rate, samples))
    }
}

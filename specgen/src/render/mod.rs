//! Spectrogram rendering
//!
//! [`Renderer`] turns a waveform into an image file. [`SpectrogramRenderer`] is
//! the production implementation: STFT power in dB, grayscale, square canvas,
//! no axes or margins.

pub mod spectrogram;
pub mod stft;

pub use spectrogram::{RenderSettings, SpectrogramRenderer};

use crate::error::RenderError;
use crate::types::Waveform;
use std::path::Path;

/// Renders a waveform to an image at `output`, overwriting any existing file
///
/// Must be deterministic: identical waveforms and settings produce identical pixels.
pub trait Renderer: Send + Sync {
    fn render(&self, waveform: &Waveform, output: &Path) -> Result<(), RenderError>;
}

//! Short-time Fourier transform producing a time-compressed PSD matrix

use crate::error::RenderError;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Power floor applied before the decibel conversion
const POWER_FLOOR: f64 = 1e-20;

/// Create a symmetric Hann window
pub fn hann_window(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let factor = 2.0 * std::f64::consts::PI / (size - 1) as f64;
    (0..size)
        .map(|i| 0.5 - 0.5 * (i as f64 * factor).cos())
        .collect()
}

/// Spectrogram in decibels, column-major
///
/// `columns[t][f]`: time column `t`, frequency bin `f` (0 = DC).
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrogram {
    pub columns: Vec<Vec<f64>>,
    pub bins: usize,
}

impl PowerSpectrogram {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Smallest and largest value
    pub fn range(&self) -> (f64, f64) {
        self.columns
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Planned transform of a fixed size
pub struct Stft {
    fft_size: usize,
    hop: usize,
    window: Vec<f64>,
    window_power: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl Stft {
    pub fn new(fft_size: usize, overlap: usize) -> Result<Self, RenderError> {
        if fft_size < 2 {
            return Err(RenderError::InvalidGeometry(format!(
                "FFT size must be at least 2, got {}",
                fft_size
            )));
        }
        if overlap >= fft_size {
            return Err(RenderError::InvalidGeometry(format!(
                "FFT overlap {} must be smaller than FFT size {}",
                overlap, fft_size
            )));
        }

        let window = hann_window(fft_size);
        let window_power = window.iter().map(|w| w * w).sum();
        let fft = FftPlanner::<f64>::new().plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            hop: fft_size - overlap,
            window,
            window_power,
            fft,
        })
    }

    /// Number of one-sided frequency bins
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of frames for a signal of `len` samples (after padding short input)
    pub fn frame_count(&self, len: usize) -> usize {
        len.max(self.fft_size).saturating_sub(self.fft_size) / self.hop + 1
    }

    /// Compute the one-sided PSD in dB, averaging frames into at most `max_columns`
    ///
    /// Frames are accumulated in linear power and converted once per column, so
    /// memory stays proportional to `max_columns * bins` regardless of duration.
    pub fn spectrogram(
        &self,
        samples: &[f32],
        sample_rate: u32,
        max_columns: usize,
    ) -> Result<PowerSpectrogram, RenderError> {
        if samples.is_empty() {
            return Err(RenderError::EmptySignal);
        }
        if sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(sample_rate));
        }
        if max_columns == 0 {
            return Err(RenderError::InvalidGeometry(
                "at least one time column is required".to_string(),
            ));
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(RenderError::NonFiniteSample { index });
        }

        let bins = self.bins();
        let frames = self.frame_count(samples.len());
        let width = frames.min(max_columns);
        let scale = 1.0 / (sample_rate as f64 * self.window_power);

        let mut power = vec![vec![0.0f64; bins]; width];
        let mut counts = vec![0usize; width];

        let mut buffer = vec![Complex::new(0.0f64, 0.0); self.fft_size];
        let mut scratch = vec![Complex::new(0.0f64, 0.0); self.fft.get_inplace_scratch_len()];

        for frame in 0..frames {
            let start = frame * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = samples.get(start + i).copied().unwrap_or(0.0) as f64;
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            let column = frame * width / frames;
            let target = &mut power[column];
            for (bin, value) in buffer[..bins].iter().enumerate() {
                let mut psd = value.norm_sqr() * scale;
                if bin != 0 && !(self.fft_size % 2 == 0 && bin == bins - 1) {
                    psd *= 2.0;
                }
                target[bin] += psd;
            }
            counts[column] += 1;
        }

        let columns = power
            .into_iter()
            .zip(counts)
            .map(|(column, count)| {
                let n = count.max(1) as f64;
                column
                    .into_iter()
                    .map(|p| 10.0 * (p / n).max(POWER_FLOOR).log10())
                    .collect()
            })
            .collect();

        Ok(PowerSpectrogram { columns, bins })
    }
}

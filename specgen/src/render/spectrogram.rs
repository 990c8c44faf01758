//! Grayscale spectrogram raster and PNG output
//!
//! **Algorithm:**
//! 1. Validate the waveform (non-empty, finite, positive sample rate)
//! 2. STFT power in dB, frames averaged into at most `resolution` columns
//! 3. Min-max normalise to 0..=255 (quiet = black), low frequencies at the bottom
//! 4. Resample to a `side x side` canvas, `side = round(resolution / dpi * dpi)`
//! 5. Encode 8-bit grayscale PNG with the pixel density set from `dpi`

use super::stft::{PowerSpectrogram, Stft};
use super::Renderer;
use crate::error::RenderError;
use crate::types::Waveform;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use specgen_common::config::RenderConfig;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const METERS_PER_INCH: f64 = 0.0254;

/// Canvas and transform parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Target image side in pixels (before the dpi round trip)
    pub resolution: u32,
    /// Pixel density recorded in the image
    pub dpi: u32,
    pub fft_size: usize,
    pub fft_overlap: usize,
}

impl RenderSettings {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            resolution: config.resolution,
            dpi: config.dpi,
            fft_size: config.fft_size,
            fft_overlap: config.fft_overlap,
        }
    }

    /// Canvas side: a `resolution / dpi` inch figure rasterised at `dpi`
    pub fn canvas_side(&self) -> u32 {
        if self.dpi == 0 {
            return 0;
        }
        let inches = self.resolution as f64 / self.dpi as f64;
        (inches * self.dpi as f64).round() as u32
    }

    /// Pixels per metre for the PNG physical dimensions chunk
    pub fn pixels_per_meter(&self) -> u32 {
        (self.dpi as f64 / METERS_PER_INCH).round() as u32
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// STFT spectrogram renderer
pub struct SpectrogramRenderer {
    settings: RenderSettings,
    stft: Stft,
}

impl SpectrogramRenderer {
    pub fn new(settings: RenderSettings) -> Result<Self, RenderError> {
        if settings.resolution == 0 || settings.dpi == 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "resolution ({}) and dpi ({}) must be positive",
                settings.resolution, settings.dpi
            )));
        }
        if settings.canvas_side() == 0 {
            return Err(RenderError::InvalidGeometry(
                "canvas would have zero pixels".to_string(),
            ));
        }

        let stft = Stft::new(settings.fft_size, settings.fft_overlap)?;
        Ok(Self { settings, stft })
    }

    pub fn from_config(config: &RenderConfig) -> Result<Self, RenderError> {
        Self::new(RenderSettings::from_config(config))
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render to an in-memory square grayscale image
    pub fn rasterize(&self, waveform: &Waveform) -> Result<GrayImage, RenderError> {
        let spectrogram = self.stft.spectrogram(
            &waveform.samples,
            waveform.sample_rate,
            self.settings.resolution as usize,
        )?;

        let matrix = to_gray(&spectrogram);
        let side = self.settings.canvas_side();

        if matrix.width() == side && matrix.height() == side {
            return Ok(matrix);
        }
        Ok(imageops::resize(&matrix, side, side, FilterType::Triangle))
    }

    /// Encode into a temporary file beside `output`, then rename over it
    ///
    /// An existing image at `output` is replaced only by a complete PNG.
    fn write_png(&self, image: &GrayImage, output: &Path) -> Result<(), RenderError> {
        let write_error = |source: io::Error| RenderError::Write {
            path: output.to_path_buf(),
            source,
        };
        let encode_error = |source| RenderError::Encode {
            path: output.to_path_buf(),
            source,
        };

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".specgen-").suffix(".png.tmp");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // File::create's mode; the umask still applies
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut temp = builder.tempfile_in(dir).map_err(write_error)?;

        {
            let mut buffered = BufWriter::new(temp.as_file_mut());
            let mut encoder = png::Encoder::new(&mut buffered, image.width(), image.height());
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);

            let ppm = self.settings.pixels_per_meter();
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));

            let mut writer = encoder.write_header().map_err(encode_error)?;
            writer.write_image_data(image.as_raw()).map_err(encode_error)?;
            writer.finish().map_err(encode_error)?;
            buffered.flush().map_err(write_error)?;
        }

        temp.persist(output).map_err(|e| write_error(e.error))?;
        Ok(())
    }
}

impl Renderer for SpectrogramRenderer {
    fn render(&self, waveform: &Waveform, output: &Path) -> Result<(), RenderError> {
        let image = self.rasterize(waveform)?;
        self.write_png(&image, output)?;

        tracing::trace!(
            output = %output.display(),
            side = image.width(),
            "Spectrogram written"
        );
        Ok(())
    }
}

/// Map dB values to 8-bit intensities; row 0 holds the highest frequency
fn to_gray(spectrogram: &PowerSpectrogram) -> GrayImage {
    let width = spectrogram.width() as u32;
    let height = spectrogram.bins as u32;
    let (lo, hi) = spectrogram.range();
    let span = hi - lo;

    GrayImage::from_fn(width, height, |x, y| {
        let bin = (height - 1 - y) as usize;
        let value = spectrogram.columns[x as usize][bin];
        let level = if span > 0.0 {
            ((value - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        Luma([level])
    })
}

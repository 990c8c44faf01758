//! Audio Test Fixture Generator
//!
//! Utilities for generating test audio files with various characteristics

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 0.5,
            sample_rate: 8000,
            channels: 2,
            frequency: 440.0,
        }
    }
}

/// Generate a 16-bit PCM sine tone
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_samples {
        // Tone at 30% amplitude
        let t = i as f32 / config.sample_rate as f32;
        let sample =
            (0.3 * (2.0 * std::f32::consts::PI * config.frequency * t).sin() * i16::MAX as f32) as i16;

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate `count` tones spread over nested subdirectories of `dir`
pub fn generate_test_library(dir: &Path, count: usize, config: &AudioConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for i in 0..count {
        let mut track = config.clone();
        track.frequency = 220.0 + 110.0 * i as f32;

        let file_path = dir
            .join(format!("artist_{}", i % 3))
            .join(format!("album_{}", i % 2))
            .join(format!("test_track_{:03}.wav", i + 1));
        generate_test_wav(&file_path, &track)?;
        files.push(file_path);
    }

    Ok(files)
}

/// Write a file with an audio extension but no decodable content
pub fn write_corrupt_file(path: &Path) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"this is not audio data at all, just some text")?;
    Ok(path.to_path_buf())
}

//! Error types for specgen
//!
//! Two tiers:
//! - Per-item errors ([`DecodeError`], [`RenderError`], wrapped in [`ItemError`])
//!   are caught at the worker boundary and turn into a skipped item.
//! - [`FatalError`] aborts the whole run with a non-zero exit.

use crate::services::file_scanner::ScanError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Audio could not be turned into a waveform
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input file could not be opened
    #[error("Failed to open audio file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Container or codec rejected the data
    #[error("Invalid audio in {}: {reason}", .path.display())]
    InvalidAudio { path: PathBuf, reason: String },

    /// External transcoder could not be started
    #[error("Failed to start {}: {source}", .program.display())]
    Spawn { program: PathBuf, source: io::Error },

    /// External transcoder exited non-zero
    #[error("{} failed for {} ({status}): {stderr}", .program.display(), .path.display())]
    ProcessFailed {
        program: PathBuf,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// External transcoder exceeded the configured timeout and was killed
    #[error("{} timed out after {timeout:?} for {}", .program.display(), .path.display())]
    Timeout {
        program: PathBuf,
        path: PathBuf,
        timeout: Duration,
    },

    /// Intermediate file could not be created
    #[error("Failed to create temporary file: {0}")]
    TempFile(#[source] io::Error),

    /// Intermediate WAV written by the transcoder is unreadable
    #[error("Invalid intermediate WAV {}: {source}", .path.display())]
    Wav { path: PathBuf, source: hound::Error },

    /// Decoded stream reported a zero sample rate
    #[error("Invalid sample rate {sample_rate} in {}", .path.display())]
    InvalidSampleRate { path: PathBuf, sample_rate: u32 },
}

/// Waveform could not be rendered or written
#[derive(Debug, Error)]
pub enum RenderError {
    /// No samples to transform
    #[error("Cannot render an empty signal")]
    EmptySignal,

    /// NaN or infinite sample
    #[error("Non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Transform or canvas parameters cannot produce an image
    #[error("Invalid render geometry: {0}")]
    InvalidGeometry(String),

    /// Destination could not be created or written
    #[error("Failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// PNG encoder failure
    #[error("Failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        source: png::EncodingError,
    },
}

/// Failure of one work item; never propagates past the worker boundary
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Pipeline panicked; the panic was contained to this item
    #[error("Worker panicked: {0}")]
    Panicked(String),
}

/// Whole-run failure
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("Configuration error: {0}")]
    Config(#[from] specgen_common::Error),

    /// Input root missing or unreadable
    #[error("File discovery failed: {0}")]
    Discovery(#[from] ScanError),

    /// Worker threads could not be started
    #[error("Worker pool initialization failed: {0}")]
    PoolInit(String),
}

/// Result type for whole-run operations
pub type Result<T> = std::result::Result<T, FatalError>;

//! # specgen
//!
//! Batch spectrogram generator: walks a directory tree for audio files and
//! writes a grayscale spectrogram image next to each one.
//!
//! **Architecture:**
//! - [`services::FileScanner`] discovers inputs
//! - [`pool::WorkerPool`] runs [`pipeline::SpectrogramPipeline`] on each input in parallel
//! - [`progress::ProgressReporter`] observes the completion stream
//! - [`orchestrator::Orchestrator`] wires them together and reports the summary

pub mod audio;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod render;
pub mod services;
pub mod types;

pub use error::{FatalError, ItemError};
pub use orchestrator::Orchestrator;
pub use types::{Completion, InputFile, OutputCollision, RunSummary, Waveform};

//! Core data model
//!
//! - [`InputFile`]: one discovered audio file, consumed once by one worker
//! - [`Waveform`]: decoded mono audio, owned by the worker that decoded it
//! - [`Completion`]: one finished work item as yielded by the pool
//! - [`OutputCollision`]: an input whose image path another input already claimed
//! - [`RunSummary`]: terminal counts for the run

use crate::error::ItemError;
use specgen_common::human_time::format_duration;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exit code used when items failed and the run is configured to report it
pub const EXIT_ITEM_FAILURES: u8 = 2;

/// Discovered audio file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputFile {
    path: PathBuf,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Output path: same directory and base name, audio extension replaced
    ///
    /// Only the final extension is replaced (`a.b.mp3` -> `a.b.png`).
    pub fn output_path(&self, image_extension: &str) -> PathBuf {
        self.path.with_extension(image_extension.trim_start_matches('.'))
    }
}

impl From<PathBuf> for InputFile {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Mono samples, nominally in [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (0 when the sample rate is unknown)
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// One finished work item
#[derive(Debug)]
pub struct Completion {
    pub item: InputFile,
    /// Written image path, or the reason the item was skipped
    pub outcome: Result<PathBuf, ItemError>,
    /// Wall time spent on this item inside its worker
    pub elapsed: Duration,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Input skipped because an earlier input maps to the same image path
///
/// `song.mp3` and `song.m4a` both render to `song.png`; only the first in
/// discovery order is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCollision {
    pub item: InputFile,
    pub output: PathBuf,
    pub claimed_by: InputFile,
}

impl fmt::Display for OutputCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "output {} already claimed by {}",
            self.output.display(),
            self.claimed_by
        )
    }
}

/// Terminal counts for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Items discovered
    pub total: usize,
    pub succeeded: usize,
    /// Inputs whose item failed
    pub failed: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Count one completion
    pub fn record(&mut self, completion: &Completion) {
        match completion.outcome {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed.push(completion.item.path().to_path_buf()),
        }
    }

    /// Count an input that was never dispatched
    pub fn record_skipped(&mut self, item: &InputFile) {
        self.failed.push(item.path().to_path_buf());
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Items that produced a completion (succeeded or failed)
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Process exit code for a completed run
    ///
    /// 0 unless `fail_on_item_error` is set and at least one item failed.
    pub fn exit_code(&self, fail_on_item_error: bool) -> u8 {
        if fail_on_item_error && !self.failed.is_empty() {
            EXIT_ITEM_FAILURES
        } else {
            0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items, {} succeeded, {} failed in {}",
            self.total,
            self.succeeded,
            self.failed.len(),
            format_duration(self.elapsed)
        )
    }
}

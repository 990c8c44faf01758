//! Test Helper Utilities
//!
//! Shared utilities for specgen integration tests

#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{generate_test_library, generate_test_wav, write_corrupt_file, AudioConfig};

use specgen_common::config::{DecoderBackend, ProgressMode};
use specgen_common::{Config, Logger};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for an in-process run over `root`
///
/// Uses the symphonia backend with `wav` inputs so no external tool is needed.
/// Logs go to `log_file` only.
pub fn test_config(root: &Path, log_file: &Path) -> Config {
    let mut config = Config::default();
    config.root_folder = root.to_path_buf();
    config.extensions = vec!["wav".to_string()];
    config.progress = ProgressMode::Off;
    config.workers.count = 4;
    config.decoder.backend = DecoderBackend::Symphonia;
    config.logging.file = log_file.to_path_buf();
    config.logging.console = false;
    config.logging.level = "debug".to_string();
    config
}

/// Logger at the configured level regardless of `RUST_LOG`
pub fn test_logger(config: &Config) -> Logger {
    Logger::with_configured_level(&config.logging).expect("logger")
}

pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Count log lines containing `pattern`
pub fn count_log_lines(path: &Path, pattern: &str) -> usize {
    read_log(path).lines().filter(|l| l.contains(pattern)).count()
}

/// All files under `root` with the given extension, relative to `root`
pub fn files_with_extension(root: &Path, extension: &str) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |x| x == extension))
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

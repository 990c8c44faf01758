//! Audio file discovery
//!
//! Recursive enumeration of files whose extension is one of a configured set.
//!
//! - The root must exist, be a directory and be readable; otherwise the scan fails
//!   and nothing is returned (no partial discovery).
//! - Hidden entries (dot-prefixed) below the root are skipped, matching shell
//!   glob semantics.
//! - Symlinks are not followed, so only regular files are returned.
//! - Unreadable entries below the root are logged and skipped.
//!
//! Results are sorted for stable logs; callers must not depend on the order.

use crate::types::InputFile;
use specgen_common::config::normalize_extension;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Root directory cannot be listed
    #[error("Cannot read directory {0}: {1}")]
    Unreadable(PathBuf, String),
}

/// Audio file scanner
pub struct FileScanner {
    extensions: HashSet<String>,
    max_depth: Option<usize>,
}

impl FileScanner {
    /// Create a scanner for the given extensions (case-insensitive, dot optional)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
            max_depth: None,
        }
    }

    /// Limit traversal depth (1 = files directly in the root)
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Scan directory tree for matching audio files
    pub fn scan(&self, root_path: &Path) -> Result<Vec<InputFile>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        // Surface an unreadable root as an error instead of an empty result
        std::fs::read_dir(root_path)
            .map_err(|e| ScanError::Unreadable(root_path.to_path_buf(), e.to_string()))?;

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.is_audio_file(entry.path()) {
                        files.push(InputFile::new(entry.into_path()));
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        files.sort();

        tracing::debug!(
            "Discovered {} audio files under {}",
            files.len(),
            root_path.display()
        );

        Ok(files)
    }

    /// Check extension against the configured set
    fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

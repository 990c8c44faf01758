//! Services used by the orchestrator

pub mod file_scanner;

pub use file_scanner::{FileScanner, ScanError};

//! # specgen Common Library
//!
//! Shared code for the spectrogram generator:
//! - Configuration model, TOML loading and override resolution
//! - The run logger (file + console sinks behind one dispatcher)
//! - Common error type
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod human_time;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::Logger;

//! Configuration loading and override resolution
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`SPECGEN_*`, resolved by the CLI parser)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! All settings are static for a run. A missing TOML file at the default location
//! is not an error; the built-in defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Square output size in pixels
pub const DEFAULT_RESOLUTION: u32 = 128;
/// Rendering density (dots per inch)
pub const DEFAULT_DPI: u32 = 92;
/// Number of parallel workers
pub const DEFAULT_WORKER_COUNT: usize = 25;
/// STFT window length in samples
pub const DEFAULT_FFT_SIZE: usize = 256;
/// Overlap between consecutive STFT windows in samples
pub const DEFAULT_FFT_OVERLAP: usize = 128;
/// Audio extensions picked up by discovery
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["mp3", "m4a"];
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";
pub const DEFAULT_ROOT_FOLDER: &str = "tracks";
pub const DEFAULT_LOG_FILE: &str = "log/generatespec.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree searched for audio files
    pub root_folder: PathBuf,

    /// Recognized audio extensions (case-insensitive, leading dot optional)
    pub extensions: Vec<String>,

    /// Progress display mode
    pub progress: ProgressMode,

    pub render: RenderConfig,
    pub workers: WorkerConfig,
    pub decoder: DecoderConfig,
    pub logging: LoggingConfig,

    /// File the configuration was loaded from (None = built-in defaults)
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Spectrogram rendering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output image width and height in pixels
    pub resolution: u32,
    /// Rendering density, recorded in the image's physical pixel size
    pub dpi: u32,
    /// Extension of the written raster files
    pub image_extension: String,
    pub fft_size: usize,
    pub fft_overlap: usize,
}

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers
    pub count: usize,
    /// Exit non-zero when any single item failed
    pub fail_on_item_error: bool,
}

/// Audio decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub backend: DecoderBackend,
    /// External transcoder executable (ffmpeg backend only)
    pub ffmpeg_path: PathBuf,
    /// Kill the external transcoder after this many seconds (None = wait forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Directory for intermediate WAV files (None = system temp dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
    /// Append-only log file
    pub file: PathBuf,
    /// Mirror messages to the console
    pub console: bool,
}

/// Which decoder turns audio files into waveforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderBackend {
    /// Shell out to ffmpeg, read the intermediate WAV
    Ffmpeg,
    /// Decode in-process with symphonia
    Symphonia,
}

/// How progress is displayed while the pool runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Bar on an interactive terminal, log lines otherwise
    Auto,
    Bar,
    Lines,
    Off,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_folder: PathBuf::from(DEFAULT_ROOT_FOLDER),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            progress: ProgressMode::Auto,
            render: RenderConfig::default(),
            workers: WorkerConfig::default(),
            decoder: DecoderConfig::default(),
            logging: LoggingConfig::default(),
            source: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            dpi: DEFAULT_DPI,
            image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
            fft_size: DEFAULT_FFT_SIZE,
            fft_overlap: DEFAULT_FFT_OVERLAP,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_WORKER_COUNT,
            fail_on_item_error: false,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            backend: DecoderBackend::Ffmpeg,
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG_PATH),
            timeout_secs: None,
            temp_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: PathBuf::from(DEFAULT_LOG_FILE),
            console: true,
        }
    }
}

impl DecoderConfig {
    /// Transcoder timeout as Duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl FromStr for DecoderBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ffmpeg" => Ok(Self::Ffmpeg),
            "symphonia" => Ok(Self::Symphonia),
            other => Err(format!(
                "unknown decoder backend '{}' (expected ffmpeg or symphonia)",
                other
            )),
        }
    }
}

impl fmt::Display for DecoderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ffmpeg => write!(f, "ffmpeg"),
            Self::Symphonia => write!(f, "symphonia"),
        }
    }
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "bar" => Ok(Self::Bar),
            "lines" => Ok(Self::Lines),
            "off" => Ok(Self::Off),
            other => Err(format!(
                "unknown progress mode '{}' (expected auto, bar, lines or off)",
                other
            )),
        }
    }
}

/// Command-line (and environment) overrides, applied on top of the TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub resolution: Option<u32>,
    pub dpi: Option<u32>,
    pub workers: Option<usize>,
    pub fail_on_item_error: Option<bool>,
    pub decoder_backend: Option<DecoderBackend>,
    pub ffmpeg_path: Option<PathBuf>,
    pub decode_timeout_secs: Option<u64>,
    pub temp_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub progress: Option<ProgressMode>,
}

impl Config {
    /// Load configuration from TOML
    ///
    /// With an explicit path the file must exist and parse. Without one, the
    /// platform default location is tried and built-in defaults are used when
    /// no file is found there.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_toml_file(path);
        }

        match default_config_path() {
            Some(path) => Self::from_toml_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from TOML text; absent keys take built-in defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize the effective configuration back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize TOML: {}", e)))
    }

    /// Apply command-line overrides (highest priority)
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(root) = overrides.root_folder {
            self.root_folder = root;
        }
        if let Some(extensions) = overrides.extensions {
            if !extensions.is_empty() {
                self.extensions = extensions;
            }
        }
        if let Some(resolution) = overrides.resolution {
            self.render.resolution = resolution;
        }
        if let Some(dpi) = overrides.dpi {
            self.render.dpi = dpi;
        }
        if let Some(count) = overrides.workers {
            self.workers.count = count;
        }
        if let Some(fail) = overrides.fail_on_item_error {
            self.workers.fail_on_item_error = fail;
        }
        if let Some(backend) = overrides.decoder_backend {
            self.decoder.backend = backend;
        }
        if let Some(path) = overrides.ffmpeg_path {
            self.decoder.ffmpeg_path = path;
        }
        if let Some(secs) = overrides.decode_timeout_secs {
            self.decoder.timeout_secs = Some(secs);
        }
        if let Some(dir) = overrides.temp_dir {
            self.decoder.temp_dir = Some(dir);
        }
        if let Some(file) = overrides.log_file {
            self.logging.file = file;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(progress) = overrides.progress {
            self.progress = progress;
        }
    }

    /// Reject settings that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        if self.render.resolution == 0 {
            return Err(Error::InvalidInput("render.resolution must be > 0".to_string()));
        }
        if self.render.dpi == 0 {
            return Err(Error::InvalidInput("render.dpi must be > 0".to_string()));
        }
        if self.render.fft_size < 2 {
            return Err(Error::InvalidInput("render.fft_size must be >= 2".to_string()));
        }
        if self.render.fft_overlap >= self.render.fft_size {
            return Err(Error::InvalidInput(format!(
                "render.fft_overlap ({}) must be smaller than render.fft_size ({})",
                self.render.fft_overlap, self.render.fft_size
            )));
        }
        if normalize_extension(&self.render.image_extension).is_empty() {
            return Err(Error::InvalidInput("render.image_extension must not be empty".to_string()));
        }
        if self.workers.count == 0 {
            return Err(Error::InvalidInput("workers.count must be > 0".to_string()));
        }
        if self.extensions.iter().all(|e| normalize_extension(e).is_empty()) {
            return Err(Error::InvalidInput("at least one audio extension is required".to_string()));
        }
        if self.decoder.timeout_secs == Some(0) {
            return Err(Error::InvalidInput("decoder.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Audio extensions, lowercased, without leading dots, empty entries dropped
    pub fn normalized_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }
}

/// Lowercase an extension and strip any leading dot
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Locate the default configuration file for the platform
///
/// Linux tries `~/.config/specgen/config.toml`, then `/etc/specgen/config.toml`.
/// Other platforms use the user configuration directory only.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("specgen").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/specgen/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

//! specgen - batch spectrogram generator
//!
//! Walks a directory tree for audio files and writes a grayscale spectrogram
//! image next to each one.
//!
//! **Exit codes:**
//! - 0: run completed (individual items may have been skipped)
//! - 1: fatal error (bad configuration, missing root, pool failure)
//! - 2: run completed with skipped items and `--fail-on-item-error` set

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use specgen::pipeline::SpectrogramPipeline;
use specgen::Orchestrator;
use specgen_common::config::{ConfigOverrides, DecoderBackend, ProgressMode};
use specgen_common::{Config, Logger};
use tracing::{error, info};

const EXIT_FATAL: u8 = 1;

/// Command-line arguments for specgen
#[derive(Parser, Debug)]
#[command(name = "specgen")]
#[command(about = "Generate spectrogram images for a tree of audio files")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "SPECGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder to scan for audio files
    #[arg(short, long, env = "SPECGEN_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Audio extension to process (repeatable)
    #[arg(short, long = "extension", value_name = "EXT", value_delimiter = ',', env = "SPECGEN_EXTENSIONS")]
    extensions: Vec<String>,

    /// Output image side in pixels
    #[arg(long, env = "SPECGEN_RESOLUTION")]
    resolution: Option<u32>,

    /// Output image density
    #[arg(long, env = "SPECGEN_DPI")]
    dpi: Option<u32>,

    /// Number of parallel workers
    #[arg(short, long, env = "SPECGEN_WORKERS")]
    workers: Option<usize>,

    /// Exit with status 2 when any item fails
    #[arg(long, env = "SPECGEN_FAIL_ON_ITEM_ERROR")]
    fail_on_item_error: bool,

    /// Decoder backend: ffmpeg or symphonia
    #[arg(long, env = "SPECGEN_DECODER")]
    decoder: Option<DecoderBackend>,

    /// Path to the ffmpeg executable
    #[arg(long, env = "SPECGEN_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// Kill a decode that runs longer than this many seconds
    #[arg(long, value_name = "SECS", env = "SPECGEN_DECODE_TIMEOUT")]
    decode_timeout: Option<u64>,

    /// Directory for intermediate decode files
    #[arg(long, env = "SPECGEN_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Log file (appended)
    #[arg(long, env = "SPECGEN_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long, env = "SPECGEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Progress display: auto, bar, lines or off
    #[arg(long, env = "SPECGEN_PROGRESS")]
    progress: Option<ProgressMode>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root_folder: self.root_folder.clone(),
            extensions: (!self.extensions.is_empty()).then(|| self.extensions.clone()),
            resolution: self.resolution,
            dpi: self.dpi,
            workers: self.workers,
            fail_on_item_error: self.fail_on_item_error.then_some(true),
            decoder_backend: self.decoder,
            ffmpeg_path: self.ffmpeg.clone(),
            decode_timeout_secs: self.decode_timeout,
            temp_dir: self.temp_dir.clone(),
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
            progress: self.progress,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(args: Args) -> Result<u8> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(0);
    }

    let logger = Logger::new(&config.logging).context("Failed to initialize logging")?;
    specgen::pool::install_panic_hook();

    let pipeline = logger.in_scope(|| {
        info!(
            "Starting specgen {} ({}, {} build, built {})",
            env!("CARGO_PKG_VERSION"),
            env!("SPECGEN_GIT_HASH"),
            env!("SPECGEN_BUILD_PROFILE"),
            env!("SPECGEN_BUILD_TIMESTAMP")
        );
        match &config.source {
            Some(path) => info!("Configuration: {}", path.display()),
            None => info!("Configuration: built-in defaults"),
        }
        info!(
            "Root folder: {} | extensions: {} | workers: {} | decoder: {}",
            config.root_folder.display(),
            config.normalized_extensions().join(","),
            config.workers.count,
            config.decoder.backend
        );

        SpectrogramPipeline::from_config(&config).map_err(|e| {
            error!("Failed to build pipeline: {}", e);
            e
        })
    });

    let pipeline = match pipeline {
        Ok(pipeline) => pipeline,
        Err(_) => return Ok(EXIT_FATAL),
    };

    let fail_on_item_error = config.workers.fail_on_item_error;
    let orchestrator = Orchestrator::with_pipeline(config, logger, pipeline);

    // Fatal errors are logged by the orchestrator
    match orchestrator.run() {
        Ok(summary) => Ok(summary.exit_code(fail_on_item_error)),
        Err(_) => Ok(EXIT_FATAL),
    }
}

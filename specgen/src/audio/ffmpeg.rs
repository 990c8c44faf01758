//! External-process decoder
//!
//! **Algorithm:**
//! 1. Create a scoped temporary `.wav` file
//! 2. Run `ffmpeg -i <input> -ac 1 -f wav <temp>` and wait (optionally with timeout)
//! 3. Read the temporary WAV into a mono waveform
//! 4. Remove the temporary file on every exit path; a failed removal is only a warning

use super::{wav, Decoder};
use crate::error::DecodeError;
use crate::types::Waveform;
use specgen_common::config::DecoderConfig;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Interval between exit checks while a timeout is armed
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest stderr excerpt carried in an error
const MAX_STDERR_CHARS: usize = 500;

/// Decoder that transcodes through an external ffmpeg process
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    program: PathBuf,
    temp_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl FfmpegDecoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            temp_dir: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            temp_dir: config.temp_dir.clone(),
            timeout: config.timeout(),
        }
    }

    /// Place intermediate files in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Kill the transcoder if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn create_temp(&self) -> Result<NamedTempFile, DecodeError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("specgen-").suffix(".wav");

        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(DecodeError::TempFile)
    }

    /// Run the transcoder, writing mono WAV to `output`
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), DecodeError> {
        let mut child = Command::new(&self.program)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-ac", "1", "-f", "wav"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DecodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Drain stderr on a helper thread so a chatty child cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let waited = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout),
            None => child.wait().map(Some),
        };

        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = collect_stderr(stderr_reader);
                return Err(DecodeError::Timeout {
                    program: self.program.clone(),
                    path: input.to_path_buf(),
                    timeout: self.timeout.unwrap_or_default(),
                });
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DecodeError::ProcessFailed {
                    program: self.program.clone(),
                    path: input.to_path_buf(),
                    status: format!("wait failed: {}", e),
                    stderr: collect_stderr(stderr_reader),
                });
            }
        };

        let stderr = collect_stderr(stderr_reader);

        if !status.success() {
            return Err(DecodeError::ProcessFailed {
                program: self.program.clone(),
                path: input.to_path_buf(),
                status: status.to_string(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            debug!("{} reported for {}: {}", self.program.display(), input.display(), stderr);
        }

        Ok(())
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::from_config(&DecoderConfig::default())
    }
}

impl Decoder for FfmpegDecoder {
    fn decode(&self, path: &Path) -> Result<Waveform, DecodeError> {
        let temp = self.create_temp()?;
        let temp_path = temp.path().to_path_buf();

        let result = self
            .transcode(path, &temp_path)
            .and_then(|()| wav::read_wav_mono(&temp_path));

        if let Err(e) = temp.close() {
            warn!(
                "Failed to remove temporary file {} for {}: {}",
                temp_path.display(),
                path.display(),
                e
            );
        }

        result
    }
}

/// Wait for the child, giving up after `timeout`
///
/// Returns `Ok(None)` when the deadline passes; the child is still running.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn collect_stderr(reader: Option<JoinHandle<String>>) -> String {
    let text = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let trimmed = text.trim();

    if trimmed.chars().count() > MAX_STDERR_CHARS {
        let excerpt: String = trimmed.chars().take(MAX_STDERR_CHARS).collect();
        format!("{}...", excerpt)
    } else {
        trimmed.to_string()
    }
}

//! Run logger
//!
//! One explicitly constructed logger per run. It owns a `tracing::Dispatch` made of:
//! - a file layer appending `YYYY-MM-DD HH:MM:SS,mmm:LEVEL: message` lines
//! - an optional console layer printing the bare message to stderr
//!
//! While a progress bar is attached with [`Logger::route_console_through`], console
//! lines are printed with the bar suspended so the two never interleave.
//!
//! The dispatcher is never installed as the global default. Callers enter it with
//! [`Logger::in_scope`]; worker threads re-enter it through a cloned [`Dispatch`].
//! The file is written unbuffered and closed when the last dispatcher clone drops.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use indicatif::ProgressBar;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Registry};

/// Timestamp layout of file lines
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Logger handle for one run
pub struct Logger {
    dispatch: Dispatch,
    file: PathBuf,
    console: ConsoleWriter,
}

impl Logger {
    /// Open the log file (creating parent directories) and build the dispatcher
    ///
    /// `RUST_LOG`, when set, replaces the configured level.
    ///
    /// # Errors
    /// * Log directory or file cannot be created
    /// * Level string is not a valid filter directive
    pub fn new(config: &LoggingConfig) -> Result<Self> {
        let filter = EnvFilter::try_from_default_env().or_else(|_| level_filter(&config.level))?;
        Self::build(config, filter)
    }

    /// Like [`Logger::new`] but filtered by the configured level only
    pub fn with_configured_level(config: &LoggingConfig) -> Result<Self> {
        Self::build(config, level_filter(&config.level)?)
    }

    fn build(config: &LoggingConfig, filter: EnvFilter) -> Result<Self> {
        if let Some(parent) = config.file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)?;

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(FileLineFormat)
            .with_writer(Mutex::new(file));

        let console = ConsoleWriter::default();
        let console_layer = config.console.then(|| {
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_writer(console.clone())
        });

        let subscriber = Registry::default()
            .with(filter)
            .with(file_layer)
            .with(console_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            file: config.file.clone(),
            console,
        })
    }

    /// Dispatcher to hand to worker threads
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Path of the log file
    pub fn log_file(&self) -> &Path {
        &self.file
    }

    /// Run `f` with this logger as the current thread's default dispatcher
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Print console lines around `bar` until the returned guard drops
    pub fn route_console_through(&self, bar: ProgressBar) -> ConsoleRoute {
        self.console.attach(Some(bar));
        ConsoleRoute {
            console: self.console.clone(),
        }
    }

    /// Whether console lines are currently printed around a progress bar
    pub fn console_routed(&self) -> bool {
        self.console.bar().is_some()
    }
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e)))
}

/// Detaches the progress bar from the console sink on drop
#[must_use = "the bar is detached as soon as the route is dropped"]
pub struct ConsoleRoute {
    console: ConsoleWriter,
}

impl Drop for ConsoleRoute {
    fn drop(&mut self) {
        self.console.attach(None);
    }
}

/// stderr sink shared between the console layer and the logger handle
#[derive(Clone, Default)]
struct ConsoleWriter {
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl ConsoleWriter {
    fn attach(&self, bar: Option<ProgressBar>) {
        if let Ok(mut slot) = self.bar.lock() {
            *slot = bar;
        }
    }

    fn bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|slot| slot.clone())
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> ConsoleLine {
        ConsoleLine {
            bar: self.bar(),
            buf: Vec::new(),
        }
    }
}

/// One formatted console event, printed when dropped
struct ConsoleLine {
    bar: Option<ProgressBar>,
    buf: Vec<u8>,
}

impl Write for ConsoleLine {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = &self.buf;
        let print = || {
            let _ = io::stderr().lock().write_all(buf);
        };
        match &self.bar {
            Some(bar) => bar.suspend(print),
            None => print(),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("file", &self.file).finish()
    }
}

/// `asctime:LEVEL: message` line layout for the file sink
struct FileLineFormat;

impl<S, N> FormatEvent<S, N> for FileLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{}:{}: ",
            chrono::Local::now().format(FILE_TIMESTAMP_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

//! Progress reporting
//!
//! Wraps the completion stream as a pass-through iterator and reports either an
//! indicatif bar (interactive stderr) or periodic log lines.

use indicatif::{ProgressBar, ProgressStyle};
use specgen_common::config::ProgressMode;
use specgen_common::human_time::format_eta;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

/// Minimum interval between progress log lines
const LINE_INTERVAL: Duration = Duration::from_secs(2);

const BAR_TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] ETA {eta} ({per_sec})";

/// Completed-of-total counter
///
/// Monotonic and saturating: ticks past `total` are ignored.
#[derive(Debug, Clone)]
pub struct ProgressState {
    total: usize,
    completed: usize,
    started: Instant,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            started: Instant::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Record one completion; returns false when already saturated
    pub fn tick(&mut self) -> bool {
        if self.completed >= self.total {
            return false;
        }
        self.completed += 1;
        true
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Completions per second over `elapsed`
    pub fn rate_over(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }

    /// Remaining time at the rate observed over `elapsed`
    pub fn eta_over(&self, elapsed: Duration) -> Option<Duration> {
        let rate = self.rate_over(elapsed);
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.completed) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }

    pub fn rate(&self) -> f64 {
        self.rate_over(self.elapsed())
    }

    pub fn eta(&self) -> Option<Duration> {
        self.eta_over(self.elapsed())
    }
}

enum Sink {
    Bar(ProgressBar),
    Lines { last_logged: Option<Instant> },
    Off,
}

/// Reports progress of a run as completions arrive
pub struct ProgressReporter {
    state: ProgressState,
    sink: Sink,
}

impl ProgressReporter {
    pub fn new(total: usize, mode: ProgressMode) -> Self {
        let sink = match resolve_mode(mode) {
            ProgressMode::Bar => Sink::Bar(make_bar(total)),
            ProgressMode::Lines => Sink::Lines { last_logged: None },
            _ => Sink::Off,
        };

        Self {
            state: ProgressState::new(total),
            sink,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// The drawn bar, when reporting in bar mode
    pub fn progress_bar(&self) -> Option<&ProgressBar> {
        match &self.sink {
            Sink::Bar(bar) => Some(bar),
            _ => None,
        }
    }

    /// Count one completion and refresh the display
    pub fn tick(&mut self) {
        if !self.state.tick() {
            tracing::debug!(
                "Progress tick ignored: already at {}/{}",
                self.state.completed(),
                self.state.total()
            );
            return;
        }

        match &mut self.sink {
            Sink::Bar(bar) => bar.inc(1),
            Sink::Lines { last_logged } => {
                let due = last_logged.map_or(true, |t| t.elapsed() >= LINE_INTERVAL);
                if due || self.state.is_complete() {
                    log_line(&self.state);
                    *last_logged = Some(Instant::now());
                }
            }
            Sink::Off => {}
        }
    }

    /// Pass items through unchanged, ticking once per item
    pub fn observe<I: Iterator>(&mut self, inner: I) -> Observed<'_, I> {
        Observed {
            inner,
            reporter: self,
        }
    }

    /// Close the display
    pub fn finish(&mut self) {
        match &mut self.sink {
            Sink::Bar(bar) => bar.finish(),
            Sink::Lines { last_logged } => {
                // Final line unless the last tick already logged it
                if last_logged.is_none() || !self.state.is_complete() {
                    log_line(&self.state);
                }
                *last_logged = Some(Instant::now());
            }
            Sink::Off => {}
        }
    }
}

/// Iterator adapter returned by [`ProgressReporter::observe`]
pub struct Observed<'a, I> {
    inner: I,
    reporter: &'a mut ProgressReporter,
}

impl<I: Iterator> Iterator for Observed<'_, I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let item = self.inner.next()?;
        self.reporter.tick();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn resolve_mode(mode: ProgressMode) -> ProgressMode {
    match mode {
        ProgressMode::Auto if std::io::stderr().is_terminal() => ProgressMode::Bar,
        ProgressMode::Auto => ProgressMode::Lines,
        other => other,
    }
}

fn make_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar
}

fn log_line(state: &ProgressState) {
    tracing::info!(
        "Progress: {}/{} ({:.1}%) | Rate: {:.1} files/sec | ETA: {}",
        state.completed(),
        state.total(),
        state.percent(),
        state.rate(),
        format_eta(state.eta())
    );
}

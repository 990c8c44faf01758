//! Human-readable duration formatting
//!
//! Used for elapsed time in the run summary and ETA in progress lines.
//!
//! Format selection by magnitude:
//! - `X.XXs` below 100 seconds
//! - `M:SS.Xs` below 100 minutes
//! - `H:MM:SS` otherwise

use std::time::Duration;

const SHORT_FORMAT_MAX: f64 = 100.0;
const MEDIUM_FORMAT_MAX: f64 = 6000.0;

/// Format a duration for log output
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use specgen_common::human_time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(4500)), "4.50s");
/// assert_eq!(format_duration(Duration::from_secs(330)), "5:30.0s");
/// assert_eq!(format_duration(Duration::from_secs(7261)), "2:01:01");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();

    if seconds < SHORT_FORMAT_MAX {
        format!("{:.2}s", seconds)
    } else if seconds < MEDIUM_FORMAT_MAX {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds - minutes * 60.0;
        format!("{}:{:04.1}s", minutes as u64, secs)
    } else {
        let total = duration.as_secs();
        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Format an optional estimate, "unknown" when there is none
pub fn format_eta(eta: Option<Duration>) -> String {
    match eta {
        Some(d) => format_duration(d),
        None => "unknown".to_string(),
    }
}

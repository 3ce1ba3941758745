//! Wall-clock time utilities for breather
//!
//! The three execution contexts never share memory, so every deadline is
//! stored as a wall-clock [`Timestamp`] (seconds since the Unix epoch) that
//! any process can compare against its own clock. A zero timestamp means
//! "unset".
//!
//! # Mock Time for Development
//!
//! In debug builds, the `BREATHER_MOCK_TIME` environment variable can be set
//! to shift the clock for all time-sensitive operations.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "BREATHER_MOCK_TIME";

/// Offset between mock time and real time, computed once per process.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => match Local.from_local_datetime(&naive_dt).single() {
                        Some(mock_dt) => {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        None => tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        ),
                    },
                    Err(_) => tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    ),
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Wall-clock instant shared between processes, in seconds since the epoch.
///
/// `Timestamp::ZERO` is the "unset" value; absent store keys read as zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0.0);

    pub fn from_secs(secs: f64) -> Self {
        if secs.is_finite() { Self(secs) } else { Self::ZERO }
    }

    pub fn from_datetime(dt: &DateTime<Local>) -> Self {
        Self(dt.timestamp_millis() as f64 / 1000.0)
    }

    /// Current time, respecting mock time
    pub fn now() -> Self {
        Self::from_datetime(&now())
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// A timestamp is set when it is strictly positive
    pub fn is_set(&self) -> bool {
        self.0 > 0.0
    }

    /// Seconds elapsed since `earlier`; negative if `earlier` is in the future
    pub fn seconds_since(&self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Local>> {
        let millis = (self.0 * 1000.0).round() as i64;
        Local.timestamp_millis_opt(millis).single()
    }

    /// The earlier of two timestamps
    pub fn min(self, other: Timestamp) -> Timestamp {
        if other.0 < self.0 { other } else { self }
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0 + rhs.as_secs_f64())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Whole seconds left in a countdown of length `window` that began at
/// `start`, evaluated at `now`.
///
/// Non-increasing in `now`, equal to `window` at `start` (and for any clock
/// that reads earlier than `start`) and exactly zero at `start + window`.
/// The result goes negative after the deadline; callers treat `<= 0` as
/// elapsed.
pub fn remaining_secs(start: Timestamp, window: Duration, now: Timestamp) -> i64 {
    let elapsed = now.seconds_since(start).max(0.0).floor() as i64;
    window.as_secs() as i64 - elapsed
}

/// Format a countdown as `mm:ss`
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Start (00:00:00) and end (23:59:59) of the local day containing `at`.
pub fn day_bounds(at: Timestamp) -> (Timestamp, Timestamp) {
    let fallback = (at, at + Duration::from_secs(86_399));

    let Some(dt) = at.to_datetime() else {
        return fallback;
    };
    let date = dt.date_naive();

    let start = Local.from_local_datetime(&date.and_time(NaiveTime::MIN)).earliest();
    let end = date
        .and_hms_opt(23, 59, 59)
        .and_then(|naive| Local.from_local_datetime(&naive).latest());

    match (start, end) {
        (Some(start), Some(end)) => (Timestamp::from_datetime(&start), Timestamp::from_datetime(&end)),
        _ => fallback,
    }
}

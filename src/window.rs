//! Archival time window
//!
//! A run archives the files whose `lastWritten` falls in `[now - lookback, now - lag)`.
//! The window is computed once when a run starts and held for the whole run.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOKBACK_MINUTES: u32 = 135;
pub const DEFAULT_LAG_MINUTES: u32 = 60;

/// Window width settings, in minutes before "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowSpec {
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u32,
    #[serde(default = "default_lag_minutes")]
    pub lag_minutes: u32,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            lookback_minutes: DEFAULT_LOOKBACK_MINUTES,
            lag_minutes: DEFAULT_LAG_MINUTES,
        }
    }
}

fn default_lookback_minutes() -> u32 {
    DEFAULT_LOOKBACK_MINUTES
}

fn default_lag_minutes() -> u32 {
    DEFAULT_LAG_MINUTES
}

impl WindowSpec {
    /// Compute the window ending `lag_minutes` before `now`
    pub fn at(&self, now: DateTime<Utc>) -> TimeWindow {
        let start = now - Duration::minutes(i64::from(self.lookback_minutes));
        let end = now - Duration::minutes(i64::from(self.lag_minutes));

        TimeWindow {
            start: start.timestamp_millis(),
            end: end.timestamp_millis(),
        }
    }
}

/// Half-open `[start, end)` range in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn contains(&self, millis: i64) -> bool {
        self.start <= millis && millis < self.end
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start).single()
    }

    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.end).single()
    }
}

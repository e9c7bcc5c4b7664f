//! 24-hour histogram window
//!
//! Storage groups rows by an hour key rendered with [`HOURLY_KEY_FORMAT`];
//! the window maps those keys back onto hour-truncated UTC timestamps and
//! fills the hours that had no rows with zero.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

/// Hour bucket key format, identical to the SQL bucket expression
pub const HOURLY_KEY_FORMAT: &str = "%Y-%m-%d-%H";

/// Number of hourly buckets in a histogram
pub const WINDOW_HOURS: usize = 24;

/// The 24 consecutive hours ending at (and including) the current hour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyWindow {
    hours: Vec<DateTime<Utc>>,
}

impl HourlyWindow {
    /// Window whose last bucket is the hour containing `now`
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        let current = truncate_to_hour(now);
        let hours = (0..WINDOW_HOURS as i64)
            .rev()
            .map(|back| current - Duration::hours(back))
            .collect();
        Self { hours }
    }

    /// Buckets, oldest first
    pub fn hours(&self) -> &[DateTime<Utc>] {
        &self.hours
    }

    /// Start of the oldest bucket
    pub fn start(&self) -> DateTime<Utc> {
        self.hours[0]
    }

    /// Start of the oldest bucket as unix seconds
    pub fn start_timestamp(&self) -> i64 {
        self.start().timestamp()
    }

    pub fn key_for(hour: DateTime<Utc>) -> String {
        hour.format(HOURLY_KEY_FORMAT).to_string()
    }

    /// Map per-key counts onto every hour of the window
    ///
    /// Keys outside the window are ignored; missing hours are zero.
    pub fn fill(&self, counts: &HashMap<String, i64>) -> BTreeMap<DateTime<Utc>, i64> {
        self.hours
            .iter()
            .map(|hour| (*hour, counts.get(&Self::key_for(*hour)).copied().unwrap_or(0)))
            .collect()
    }
}

fn truncate_to_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    let past_hour = at.timestamp().rem_euclid(3600);
    at - Duration::seconds(past_hour) - Duration::nanoseconds(i64::from(at.timestamp_subsec_nanos()))
}

//! Time-of-day parsing and booking window arithmetic.
//!
//! Bookings carry a date plus a start and end time of day. The end time is
//! computed once, at creation, from the listing's duration. The arithmetic
//! wraps at midnight without advancing the date: a 90 minute service at
//! 23:00 ends at 00:30 on the same booking date.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Errors from schedule values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The input is not a 24-hour `HH:MM` (or `HH:MM:SS`) time.
    #[error("invalid time of day: {0:?}")]
    InvalidTime(String),
    /// Duration is zero or negative.
    #[error("duration must be greater than zero")]
    NonPositiveDuration,
    /// Duration does not fit a single day.
    #[error("duration must be at most {max} minutes")]
    DurationTooLong {
        /// Maximum allowed minutes.
        max: u32,
    },
}

/// Parse a 24-hour time of day.
///
/// Accepts `HH:MM`, which is what time inputs submit, and `HH:MM:SS`,
/// which is how the store returns `time` columns.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidTime`] for anything else.
pub fn parse_time(s: &str) -> Result<NaiveTime, ScheduleError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTime(s.to_owned()))
}

/// Format a time of day as `HH:MM`.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Length of a service in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ServiceDuration(u32);

impl ServiceDuration {
    /// Longest bookable service.
    pub const MAX_MINUTES: u32 = 24 * 60;

    /// Create a duration from minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if `minutes <= 0` or exceeds [`Self::MAX_MINUTES`].
    pub fn from_minutes(minutes: i64) -> Result<Self, ScheduleError> {
        if minutes <= 0 {
            return Err(ScheduleError::NonPositiveDuration);
        }
        u32::try_from(minutes)
            .ok()
            .filter(|m| *m <= Self::MAX_MINUTES)
            .map(Self)
            .ok_or(ScheduleError::DurationTooLong {
                max: Self::MAX_MINUTES,
            })
    }

    /// Whole minutes.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for ServiceDuration {
    type Error = ScheduleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
    }
}

impl From<ServiceDuration> for i64 {
    fn from(duration: ServiceDuration) -> Self {
        Self::from(duration.0)
    }
}

/// End of a booking window that starts at `start` and lasts `duration`.
///
/// Wraps past midnight; see [`wraps_midnight`] to detect that case.
#[must_use]
pub fn end_time(start: NaiveTime, duration: ServiceDuration) -> NaiveTime {
    start
        .overflowing_add_signed(TimeDelta::minutes(i64::from(duration.0)))
        .0
}

/// Whether the window starting at `start` runs into the next day. A window
/// ending exactly at 00:00 counts.
#[must_use]
pub fn wraps_midnight(start: NaiveTime, duration: ServiceDuration) -> bool {
    start
        .overflowing_add_signed(TimeDelta::minutes(i64::from(duration.0)))
        .1
        != 0
}

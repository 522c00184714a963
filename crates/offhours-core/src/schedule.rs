//! Daily schedule configuration.
//!
//! The schedule is a pair of wall-clock triggers (stop and start) evaluated
//! in a configured timezone. It is built once at startup and never mutated.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, Result};

/// A wall-clock time with minute precision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a time of day.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeOfDay`] if `hour > 23` or `minute > 59`.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(CoreError::InvalidTimeOfDay(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    /// The hour component (0-23).
    #[must_use]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// The minute component (0-59).
    #[must_use]
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Whether `time` falls inside this minute.
    #[must_use]
    pub fn matches(&self, time: NaiveTime) -> bool {
        time.hour() == u32::from(self.hour) && time.minute() == u32::from(self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidTimeOfDay(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty()
            || hour.len() > 2
            || minute.len() != 2
            || !all_digits(hour)
            || !all_digits(minute)
        {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

fn all_digits(field: &str) -> bool {
    field.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl fmt::Debug for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeOfDay({self})")
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// The timezone in which trigger times are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleTimezone {
    /// Coordinated Universal Time.
    #[default]
    Utc,
    /// The host's local timezone.
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
    /// A named IANA zone; daylight saving shifts are applied.
    Named(Tz),
}

impl ScheduleTimezone {
    /// Convert an instant to the wall-clock date and time in this timezone.
    #[must_use]
    pub fn localize(&self, now: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Utc => now.naive_utc(),
            Self::Local => now.with_timezone(&Local).naive_local(),
            Self::Fixed(offset) => now.with_timezone(offset).naive_local(),
            Self::Named(tz) => now.with_timezone(tz).naive_local(),
        }
    }
}

impl FromStr for ScheduleTimezone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "utc" | "z" | "gmt" => return Ok(Self::Utc),
            "local" => return Ok(Self::Local),
            _ => {}
        }

        let invalid = || CoreError::InvalidTimezone(s.to_string());
        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return trimmed.parse::<Tz>().map(Self::Named).map_err(|_| invalid()),
        };
        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 || !all_digits(hours) || !all_digits(minutes) {
            return Err(invalid());
        }
        let hours: u8 = hours.parse().map_err(|_| invalid())?;
        let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
        if hours > 14 || minutes > 59 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (i32::from(hours) * 3600 + i32::from(minutes) * 60))
            .map(Self::Fixed)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for ScheduleTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("utc"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// The daily stop/start schedule.
///
/// Construction enforces `stop_time != start_time`; the value is immutable
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    stop_time: TimeOfDay,
    start_time: TimeOfDay,
    timezone: ScheduleTimezone,
}

impl ScheduleConfig {
    /// Build a validated schedule.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdenticalTriggerTimes`] if both triggers fall in
    /// the same minute.
    pub fn new(
        stop_time: TimeOfDay,
        start_time: TimeOfDay,
        timezone: ScheduleTimezone,
    ) -> Result<Self> {
        if stop_time == start_time {
            return Err(CoreError::IdenticalTriggerTimes(stop_time.to_string()));
        }
        Ok(Self {
            stop_time,
            start_time,
            timezone,
        })
    }

    /// When the stop sequence fires each day.
    #[must_use]
    pub const fn stop_time(&self) -> TimeOfDay {
        self.stop_time
    }

    /// When the start sequence fires each day.
    #[must_use]
    pub const fn start_time(&self) -> TimeOfDay {
        self.start_time
    }

    /// Timezone used to evaluate both triggers.
    #[must_use]
    pub const fn timezone(&self) -> ScheduleTimezone {
        self.timezone
    }
}

impl Default for ScheduleConfig {
    /// Stop at 14:45 and start at 08:00, UTC.
    fn default() -> Self {
        Self {
            stop_time: TimeOfDay {
                hour: 14,
                minute: 45,
            },
            start_time: TimeOfDay { hour: 8, minute: 0 },
            timezone: ScheduleTimezone::Utc,
        }
    }
}

//! Common error types for offhours.
//!
//! These errors cover configuration values that are parsed at startup.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing or validating configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A time of day was not in `HH:MM` form or was out of range.
    #[error("invalid time of day '{0}': expected HH:MM (00:00-23:59)")]
    InvalidTimeOfDay(String),

    /// A timezone was neither `utc`, `local` nor a `+HH:MM` offset.
    #[error("invalid timezone '{0}': expected 'utc', 'local' or an offset like '+02:00'")]
    InvalidTimezone(String),

    /// Stop and start triggers were configured for the same minute.
    #[error("stop time and start time must differ (both are {0})")]
    IdenticalTriggerTimes(String),

    /// A backup identifier was empty.
    #[error("backup id must not be empty")]
    EmptyBackupId,
}

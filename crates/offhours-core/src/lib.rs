//! Core types for offhours.
//!
//! This crate provides the value types shared by every other offhours crate:
//!
//! - **Schedule**: [`TimeOfDay`], [`ScheduleTimezone`] and the validated
//!   [`ScheduleConfig`] that drives the daily stop/start triggers
//! - **Identifiers**: [`BackupId`] for pre-stop backups
//! - **Error types**: configuration parsing and validation errors
//!
//! # Example
//!
//! ```
//! use offhours_core::{ScheduleConfig, ScheduleTimezone, TimeOfDay};
//!
//! let config = ScheduleConfig::new(
//!     "14:45".parse::<TimeOfDay>().unwrap(),
//!     "08:00".parse::<TimeOfDay>().unwrap(),
//!     ScheduleTimezone::Utc,
//! )
//! .unwrap();
//!
//! assert_eq!(config.start_time().to_string(), "08:00");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backup;
pub mod error;
pub mod schedule;

pub use backup::BackupId;
pub use error::{CoreError, Result};
pub use schedule::{ScheduleConfig, ScheduleTimezone, TimeOfDay};

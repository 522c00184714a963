//! Backup identifiers.
//!
//! A [`BackupId`] names a pre-stop backup object. Generated ids are derived
//! from the capture timestamp plus a random suffix so that two stop
//! sequences in the same second still produce distinct names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Prefix shared by every generated backup name.
pub const BACKUP_NAME_PREFIX: &str = "pre-stop-backup";

/// The name of a backup request submitted before a stop sequence.
///
/// Names are valid Kubernetes object names (lowercase alphanumerics and `-`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupId(String);

impl BackupId {
    /// Generate a new unique backup name for the given capture time.
    ///
    /// The format is `pre-stop-backup-YYYYMMDD-HHMMSS-xxxxxxxx`.
    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{BACKUP_NAME_PREFIX}-{}-{}",
            at.format("%Y%m%d-%H%M%S"),
            &suffix[..8]
        ))
    }

    /// Wrap an existing backup name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyBackupId`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::EmptyBackupId);
        }
        Ok(Self(name))
    }

    /// Return the backup name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackupId({})", self.0)
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BackupId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BackupId> for String {
    fn from(id: BackupId) -> Self {
        id.0
    }
}

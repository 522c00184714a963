//! Filesystem storage implementation.
//!
//! Each record lives in its own JSON file inside a per-cluster state
//! directory. Writes go to a hidden temp file which is synced and then
//! renamed over the target, so a reader sees either the old or the new
//! record, never a partial one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::types::{PersistedStopState, StopRecord, WorkloadSnapshot};
use crate::StateStore;

/// File name of the workload snapshot.
pub const SNAPSHOT_FILE: &str = "workload-snapshot.json";

/// File name of the stop record.
pub const STOP_RECORD_FILE: &str = "stop-record.json";

/// File-backed [`StateStore`].
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open (and create if needed) a state directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// The state directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(STOP_RECORD_FILE)
    }

    fn write_atomic<T: Serialize>(&self, file_name: &str, value: &T) -> Result<()> {
        let final_path = self.dir.join(file_name);
        let tmp_path = self.dir.join(format!(".{file_name}.tmp"));

        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
        file.write_all(&json)
            .and_then(|()| file.sync_all())
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &final_path).map_err(|e| StoreError::io(&final_path, e))?;

        debug!(path = %final_path.display(), "Wrote state file");
        Ok(())
    }

    fn read_optional<T: DeserializeOwned>(path: &Path) -> Option<T> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable state file, treating as absent");
                return None;
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt state file, treating as absent");
                None
            }
        }
    }

    fn remove_if_exists(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

impl StateStore for FileStateStore {
    fn save_stop_state(&self, snapshot: &WorkloadSnapshot, record: &StopRecord) -> Result<()> {
        // The stop record is the witness of a paused cluster, so it lands last.
        self.write_atomic(SNAPSHOT_FILE, snapshot)?;
        self.write_atomic(STOP_RECORD_FILE, record)
    }

    fn load_stop_state(&self) -> PersistedStopState {
        PersistedStopState::from_parts(
            Self::read_optional(&self.snapshot_path()),
            Self::read_optional(&self.record_path()),
        )
    }

    fn clear_stop_state(&self) -> Result<()> {
        Self::remove_if_exists(&self.record_path())?;
        Self::remove_if_exists(&self.snapshot_path())
    }
}

//! Durable pre-stop state for offhours.
//!
//! This crate persists the two records that witness a paused cluster:
//!
//! - `WorkloadSnapshot`: the replica counts captured before scale-down
//! - `StopRecord`: when the cluster was stopped, the backup taken, and the
//!   expected restart time
//!
//! The records are written and removed as one logical unit. A reader that
//! finds only one of them gets a [`PersistedStopState::SnapshotOnly`] or
//! [`PersistedStopState::RecordOnly`] value and must treat it as inconsistent.
//!
//! # Example
//!
//! ```no_run
//! use offhours_store::{FileStateStore, PersistedStopState, StateStore};
//!
//! let store = FileStateStore::open("/var/lib/offhours/aks-demo").unwrap();
//!
//! match store.load_stop_state() {
//!     PersistedStopState::Absent => println!("cluster is running"),
//!     PersistedStopState::Complete { record, .. } => {
//!         println!("stopped at {}", record.stopped_at);
//!     }
//!     other => println!("inconsistent: {other:?}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod file;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod types;

pub use error::{Result, StoreError};
pub use file::FileStateStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryStateStore;
pub use types::{PersistedStopState, SnapshotEntry, StopRecord, WorkloadSnapshot};

/// Persistence of the pre-stop state.
///
/// Implementations must make each write atomic with respect to a process
/// crash. Loading never fails: a missing or unreadable record is reported as
/// absent.
pub trait StateStore: Send + Sync {
    /// Persist the snapshot and stop record, replacing any previous state.
    ///
    /// # Errors
    ///
    /// Returns an error if either record cannot be written.
    fn save_stop_state(&self, snapshot: &WorkloadSnapshot, record: &StopRecord) -> Result<()>;

    /// Load whatever pre-stop state is currently persisted.
    fn load_stop_state(&self) -> PersistedStopState;

    /// Remove both records. Removing absent records is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be removed.
    fn clear_stop_state(&self) -> Result<()>;
}

//! In-memory storage for tests.

use parking_lot::Mutex;

use crate::error::{Result, StoreError};
use crate::types::{PersistedStopState, StopRecord, WorkloadSnapshot};
use crate::StateStore;

/// A [`StateStore`] that keeps both records in memory.
///
/// Each record can be seeded or removed independently to simulate crashes
/// and corruption, and writes can be made to fail.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: Option<WorkloadSnapshot>,
    record: Option<StopRecord>,
    fail_writes: bool,
    saves: usize,
    clears: usize,
}

impl InMemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the snapshot directly, bypassing the unit-write contract.
    pub fn set_snapshot(&self, snapshot: Option<WorkloadSnapshot>) {
        self.inner.lock().snapshot = snapshot;
    }

    /// Overwrite the stop record directly, bypassing the unit-write contract.
    pub fn set_record(&self, record: Option<StopRecord>) {
        self.inner.lock().record = record;
    }

    /// Make subsequent saves and clears fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }

    /// Number of successful clears.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.inner.lock().clears
    }
}

impl StateStore for InMemoryStateStore {
    fn save_stop_state(&self, snapshot: &WorkloadSnapshot, record: &StopRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StoreError::Serialization("injected write failure".to_string()));
        }
        inner.snapshot = Some(snapshot.clone());
        inner.record = Some(record.clone());
        inner.saves += 1;
        Ok(())
    }

    fn load_stop_state(&self) -> PersistedStopState {
        let inner = self.inner.lock();
        PersistedStopState::from_parts(inner.snapshot.clone(), inner.record.clone())
    }

    fn clear_stop_state(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StoreError::Serialization("injected write failure".to_string()));
        }
        inner.snapshot = None;
        inner.record = None;
        inner.clears += 1;
        Ok(())
    }
}

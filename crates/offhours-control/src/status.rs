//! Read-only status query over the persisted stop state.

use std::fmt;

use offhours_store::{PersistedStopState, StateStore, StopRecord};
use serde::Serialize;

/// What the persisted stop state says about the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClusterStatus {
    /// No stop state is persisted.
    Running,
    /// A complete stop state is persisted.
    Stopped {
        /// The stop record.
        #[serde(flatten)]
        record: StopRecord,
        /// Number of workloads waiting to be restored.
        workloads: usize,
    },
    /// Exactly one of the two records is persisted.
    #[serde(rename_all = "camelCase")]
    Inconsistent {
        /// Whether the workload snapshot exists.
        has_snapshot: bool,
        /// Whether the stop record exists.
        has_record: bool,
    },
}

impl ClusterStatus {
    /// Process exit code for a status query.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Running | Self::Stopped { .. } => 0,
            Self::Inconsistent { .. } => 3,
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => writeln!(f, "Cluster is running"),
            Self::Stopped { record, workloads } => {
                writeln!(f, "Cluster is stopped")?;
                writeln!(f, "  stoppedAt:   {}", record.stopped_at.to_rfc3339())?;
                match &record.backup_id {
                    Some(id) => writeln!(f, "  backupId:    {id}")?,
                    None => writeln!(f, "  backupId:    none")?,
                }
                writeln!(f, "  restartTime: {}", record.restart_time)?;
                writeln!(f, "  workloads:   {workloads}")
            }
            Self::Inconsistent {
                has_snapshot,
                has_record,
            } => {
                writeln!(f, "Stop state is inconsistent, manual reconciliation required")?;
                writeln!(f, "  workload snapshot: {}", if *has_snapshot { "present" } else { "missing" })?;
                writeln!(f, "  stop record:       {}", if *has_record { "present" } else { "missing" })
            }
        }
    }
}

/// Inspect the store without changing anything.
pub fn query_status<S: StateStore + ?Sized>(store: &S) -> ClusterStatus {
    match store.load_stop_state() {
        PersistedStopState::Absent => ClusterStatus::Running,
        PersistedStopState::Complete { snapshot, record } => ClusterStatus::Stopped {
            record,
            workloads: snapshot.len(),
        },
        PersistedStopState::SnapshotOnly(_) => ClusterStatus::Inconsistent {
            has_snapshot: true,
            has_record: false,
        },
        PersistedStopState::RecordOnly(_) => ClusterStatus::Inconsistent {
            has_snapshot: false,
            has_record: true,
        },
    }
}

//! Persisted record types.

use chrono::{DateTime, Utc};
use offhours_core::BackupId;
use serde::{Deserialize, Serialize};

/// One workload captured before scale-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    /// Workload name.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// Replica count at capture time. Always greater than zero.
    pub original_replicas: u32,
}

impl SnapshotEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, original_replicas: u32) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            original_replicas,
        }
    }
}

/// The replica counts to restore, in capture order.
///
/// Only workloads that had non-zero replicas are ever pushed, including when
/// a snapshot is read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SnapshotEntry>", into = "Vec<SnapshotEntry>")]
pub struct WorkloadSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl WorkloadSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a workload. Zero-replica workloads are ignored and `false` is
    /// returned.
    pub fn record(&mut self, entry: SnapshotEntry) -> bool {
        if entry.original_replicas == 0 {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// The recorded entries in capture order.
    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Number of recorded workloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SnapshotEntry> for WorkloadSnapshot {
    fn from_iter<I: IntoIterator<Item = SnapshotEntry>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for entry in iter {
            snapshot.record(entry);
        }
        snapshot
    }
}

impl From<Vec<SnapshotEntry>> for WorkloadSnapshot {
    fn from(entries: Vec<SnapshotEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<WorkloadSnapshot> for Vec<SnapshotEntry> {
    fn from(snapshot: WorkloadSnapshot) -> Self {
        snapshot.entries
    }
}

/// Durable witness that the cluster is paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    /// When the stop sequence finished.
    pub stopped_at: DateTime<Utc>,
    /// The pre-stop backup, if one was obtained.
    #[serde(default)]
    pub backup_id: Option<BackupId>,
    /// The configured start time (`HH:MM`).
    pub restart_time: String,
}

/// What a load of the pre-stop state found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedStopState {
    /// Neither record exists.
    Absent,
    /// Both records exist.
    Complete {
        /// The captured replica counts.
        snapshot: WorkloadSnapshot,
        /// The stop record.
        record: StopRecord,
    },
    /// Only the snapshot exists.
    SnapshotOnly(WorkloadSnapshot),
    /// Only the stop record exists.
    RecordOnly(StopRecord),
}

impl PersistedStopState {
    /// Combine the independently loaded records.
    #[must_use]
    pub fn from_parts(snapshot: Option<WorkloadSnapshot>, record: Option<StopRecord>) -> Self {
        match (snapshot, record) {
            (None, None) => Self::Absent,
            (Some(snapshot), Some(record)) => Self::Complete { snapshot, record },
            (Some(snapshot), None) => Self::SnapshotOnly(snapshot),
            (None, Some(record)) => Self::RecordOnly(record),
        }
    }

    /// Whether exactly one of the two records is present.
    #[must_use]
    pub const fn is_inconsistent(&self) -> bool {
        matches!(self, Self::SnapshotOnly(_) | Self::RecordOnly(_))
    }

    /// The stop record, if present.
    #[must_use]
    pub const fn record(&self) -> Option<&StopRecord> {
        match self {
            Self::Complete { record, .. } | Self::RecordOnly(record) => Some(record),
            Self::Absent | Self::SnapshotOnly(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_skips_zero_replicas() {
        let mut snapshot = WorkloadSnapshot::new();
        assert!(snapshot.record(SnapshotEntry::new("d1", "default", 2)));
        assert!(!snapshot.record(SnapshotEntry::new("d2", "default", 0)));
        assert!(snapshot.record(SnapshotEntry::new("d3", "default", 5)));

        let names: Vec<_> = snapshot.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["d1", "d3"]);
    }

    #[test]
    fn snapshot_serializes_as_camel_case_list() {
        let snapshot: WorkloadSnapshot = [SnapshotEntry::new("d1", "default", 2)].into_iter().collect();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "name": "d1", "namespace": "default", "originalReplicas": 2 }])
        );
    }

    #[test]
    fn snapshot_load_drops_zero_replica_entries() {
        let snapshot: WorkloadSnapshot = serde_json::from_str(
            r#"[
                { "name": "d1", "namespace": "default", "originalReplicas": 2 },
                { "name": "d2", "namespace": "default", "originalReplicas": 0 }
            ]"#,
        )
        .unwrap();
        assert_eq!(snapshot.entries(), &[SnapshotEntry::new("d1", "default", 2)]);
    }

    #[test]
    fn stop_record_uses_camel_case_keys() {
        let record = StopRecord {
            stopped_at: Utc::now(),
            backup_id: None,
            restart_time: "08:00".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("stoppedAt").is_some());
        assert!(json.get("restartTime").is_some());
        assert!(json.get("backupId").unwrap().is_null());
    }

    #[test]
    fn parts_classification() {
        let record = StopRecord {
            stopped_at: Utc::now(),
            backup_id: None,
            restart_time: "08:00".to_string(),
        };
        assert_eq!(PersistedStopState::from_parts(None, None), PersistedStopState::Absent);
        assert!(PersistedStopState::from_parts(Some(WorkloadSnapshot::new()), None).is_inconsistent());
        assert!(PersistedStopState::from_parts(None, Some(record.clone())).is_inconsistent());
        assert!(!PersistedStopState::from_parts(Some(WorkloadSnapshot::new()), Some(record))
            .is_inconsistent());
    }
}

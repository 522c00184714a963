//! End-to-end lifecycle tests against the file-backed state store.

use std::sync::Arc;
use std::time::Duration;

use offhours_cluster::{MockControlPlane, WorkloadInfo};
use offhours_control::{
    query_status, ClusterLifecycleState, ClusterStatus, LifecycleConfig, LifecycleController,
    LifecycleError, StartOutcome, StopOutcome,
};
use offhours_core::ScheduleConfig;
use offhours_store::{FileStateStore, PersistedStopState, SnapshotEntry, StateStore, WorkloadSnapshot};
use tempfile::TempDir;

fn config() -> LifecycleConfig {
    LifecycleConfig::new("default", ScheduleConfig::default()).with_settle_grace(Duration::ZERO)
}

fn cluster() -> Arc<MockControlPlane> {
    Arc::new(MockControlPlane::with_workloads([
        WorkloadInfo::new("api", "default", 3),
        WorkloadInfo::new("worker", "default", 0),
        WorkloadInfo::new("web", "default", 2),
        WorkloadInfo::new("other", "kube-system", 1),
    ]))
}

#[tokio::test]
async fn stop_and_start_round_trip_through_files() {
    let dir = TempDir::new().unwrap();
    let cluster = cluster();
    let store = Arc::new(FileStateStore::open(dir.path()).unwrap());
    let controller = LifecycleController::new(Arc::clone(&cluster), Arc::clone(&store), config());

    let StopOutcome::Stopped(report) = controller.stop().await.unwrap() else {
        panic!("expected the stop sequence to run");
    };
    assert_eq!(report.scaled, 2);
    assert_eq!(cluster.replicas("api"), Some(0));
    assert_eq!(cluster.replicas("web"), Some(0));
    assert_eq!(cluster.replicas("other"), Some(1));

    match query_status(store.as_ref()) {
        ClusterStatus::Stopped { record, workloads } => {
            assert_eq!(workloads, 2);
            assert_eq!(record.restart_time, "08:00");
            assert_eq!(record.backup_id, report.backup_id);
        }
        other => panic!("expected stopped status, got {other:?}"),
    }

    let outcome = controller.start().await.unwrap();
    assert!(matches!(outcome, StartOutcome::Started(ref r) if r.restored == 2));
    assert_eq!(cluster.replicas("api"), Some(3));
    assert_eq!(cluster.replicas("web"), Some(2));
    assert_eq!(cluster.replicas("worker"), Some(0));
    assert_eq!(query_status(store.as_ref()), ClusterStatus::Running);
}

#[tokio::test]
async fn stop_state_survives_process_restart() {
    let dir = TempDir::new().unwrap();
    let cluster = cluster();

    {
        let store = Arc::new(FileStateStore::open(dir.path()).unwrap());
        let controller = LifecycleController::new(Arc::clone(&cluster), store, config());
        controller.stop().await.unwrap();
    }

    let store = Arc::new(FileStateStore::open(dir.path()).unwrap());
    let controller = LifecycleController::new(Arc::clone(&cluster), Arc::clone(&store), config());
    assert_eq!(controller.state().unwrap(), ClusterLifecycleState::Stopped);

    // A second stop after restart must not overwrite the snapshot with zeros.
    assert!(matches!(
        controller.stop().await.unwrap(),
        StopOutcome::AlreadyStopped { .. }
    ));

    controller.start().await.unwrap();
    assert_eq!(cluster.replicas("api"), Some(3));
    assert_eq!(store.load_stop_state(), PersistedStopState::Absent);
}

#[tokio::test]
async fn missing_snapshot_file_blocks_start() {
    let dir = TempDir::new().unwrap();
    let cluster = cluster();
    let store = Arc::new(FileStateStore::open(dir.path()).unwrap());
    let controller = LifecycleController::new(Arc::clone(&cluster), Arc::clone(&store), config());

    controller.stop().await.unwrap();
    std::fs::remove_file(dir.path().join(offhours_store::file::SNAPSHOT_FILE)).unwrap();

    let err = controller.start().await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InconsistentState {
            has_snapshot: false,
            has_record: true
        }
    ));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(cluster.replicas("api"), Some(0));
    assert!(dir.path().join(offhours_store::file::STOP_RECORD_FILE).exists());
}

#[tokio::test]
async fn corrupt_record_reads_as_absent() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::open(dir.path()).unwrap();
    let snapshot: WorkloadSnapshot = [SnapshotEntry::new("api", "default", 3)].into_iter().collect();
    let record = offhours_store::StopRecord {
        stopped_at: chrono::Utc::now(),
        backup_id: None,
        restart_time: "08:00".to_string(),
    };
    store.save_stop_state(&snapshot, &record).unwrap();
    std::fs::write(
        dir.path().join(offhours_store::file::STOP_RECORD_FILE),
        b"{not json",
    )
    .unwrap();

    assert!(matches!(
        query_status(&store),
        ClusterStatus::Inconsistent {
            has_snapshot: true,
            has_record: false
        }
    ));
}

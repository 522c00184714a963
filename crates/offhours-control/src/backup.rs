//! Pre-stop backup coordination.

use std::sync::Arc;

use offhours_cluster::{BackupRequest, ControlPlaneClient};
use offhours_core::BackupId;
use tracing::{info, warn};

use crate::clock::Clock;

/// Requests a backup of the managed namespace before a stop.
///
/// A failed backup is never fatal: the stop proceeds without one.
pub struct BackupCoordinator<C: ControlPlaneClient> {
    cluster: Arc<C>,
    namespace: String,
    clock: Arc<dyn Clock>,
}

impl<C: ControlPlaneClient> BackupCoordinator<C> {
    /// Create a coordinator for `namespace`.
    #[must_use]
    pub fn new(cluster: Arc<C>, namespace: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            clock,
        }
    }

    /// Submit a pre-stop backup.
    ///
    /// Returns the backup name on success and `None` on any failure.
    pub async fn create_backup(&self) -> Option<BackupId> {
        let name = BackupId::generate(self.clock.now());
        let request = BackupRequest::pre_stop(name.clone(), vec![self.namespace.clone()]);

        match self.cluster.submit_backup(&request).await {
            Ok(()) => {
                info!(backup = %name, namespace = %self.namespace, "Pre-stop backup requested");
                Some(name)
            }
            Err(e) => {
                warn!(
                    backup = %name,
                    error = %e,
                    "Pre-stop backup failed, continuing without backup"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use offhours_cluster::MockControlPlane;

    fn coordinator(cluster: &Arc<MockControlPlane>) -> BackupCoordinator<MockControlPlane> {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 14, 45, 3).unwrap();
        BackupCoordinator::new(Arc::clone(cluster), "default", Arc::new(ManualClock::new(at)))
    }

    #[tokio::test]
    async fn submits_namespaced_request() {
        let cluster = Arc::new(MockControlPlane::new());
        let id = coordinator(&cluster).create_backup().await.unwrap();

        assert!(id.as_str().starts_with("pre-stop-backup-20240304-144503-"));

        let backups = cluster.backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].name, id);
        assert_eq!(backups[0].include_namespaces, vec!["default".to_string()]);
        assert!(backups[0].snapshot_volumes);
        assert_eq!(
            backups[0].labels.get("backup-type").map(String::as_str),
            Some("pre-stop")
        );
    }

    #[tokio::test]
    async fn failure_yields_none() {
        let cluster = Arc::new(MockControlPlane::new());
        cluster.fail_backup(true);

        assert!(coordinator(&cluster).create_backup().await.is_none());
        assert!(cluster.backups().is_empty());
    }
}

//! Velero backup object builder.
//!
//! Pre-stop backups are submitted as `velero.io/v1` `Backup` custom
//! resources. This module turns a [`BackupRequest`] into the dynamic object
//! the Kubernetes API expects.

use std::time::Duration;

use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use serde_json::json;

use crate::types::{BackupRequest, ClusterConfig};

/// API group of Velero resources.
pub const VELERO_GROUP: &str = "velero.io";

/// API version of Velero resources.
pub const VELERO_VERSION: &str = "v1";

/// The `ApiResource` for Velero `Backup` objects.
#[must_use]
pub fn backup_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(VELERO_GROUP, VELERO_VERSION, "Backup"))
}

/// Build the `Backup` object for a request.
#[must_use]
pub fn build_backup(request: &BackupRequest, config: &ClusterConfig) -> DynamicObject {
    let ar = backup_api_resource();
    let mut backup = DynamicObject::new(request.name.as_str(), &ar)
        .within(&config.backup_namespace)
        .data(json!({
            "spec": {
                "includedNamespaces": request.include_namespaces,
                "storageLocation": config.backup_storage_location,
                "ttl": go_duration(request.ttl),
                "snapshotVolumes": request.snapshot_volumes,
            }
        }));
    backup.metadata.labels = Some(request.labels.clone());
    backup
}

/// Format a duration the way Go's `time.Duration` prints it (e.g. `168h0m0s`).
#[must_use]
pub fn go_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use offhours_core::BackupId;

    #[test]
    fn ttl_formatting() {
        assert_eq!(go_duration(BackupRequest::DEFAULT_TTL), "168h0m0s");
        assert_eq!(go_duration(Duration::from_secs(5400 + 7)), "1h30m7s");
    }

    #[test]
    fn backup_object_shape() {
        let request = BackupRequest::pre_stop(
            BackupId::new("pre-stop-backup-20261016-144500-abcd1234").unwrap(),
            vec!["default".to_string()],
        );
        let backup = build_backup(&request, &ClusterConfig::default());
        let value = serde_json::to_value(&backup).unwrap();

        assert_eq!(value["apiVersion"], "velero.io/v1");
        assert_eq!(value["kind"], "Backup");
        assert_eq!(
            value["metadata"]["name"],
            "pre-stop-backup-20261016-144500-abcd1234"
        );
        assert_eq!(value["metadata"]["namespace"], "dataprotection-microsoft");
        assert_eq!(value["metadata"]["labels"]["backup-type"], "pre-stop");
        assert_eq!(value["spec"]["includedNamespaces"], json!(["default"]));
        assert_eq!(value["spec"]["storageLocation"], "default");
        assert_eq!(value["spec"]["ttl"], "168h0m0s");
        assert_eq!(value["spec"]["snapshotVolumes"], true);
    }

    #[test]
    fn api_resource_plural() {
        let ar = backup_api_resource();
        assert_eq!(ar.plural, "backups");
        assert_eq!(ar.api_version, "velero.io/v1");
    }
}

//! Types for the cluster crate.

use std::collections::BTreeMap;
use std::time::Duration;

use offhours_core::BackupId;
use serde::{Deserialize, Serialize};

/// A scalable workload as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadInfo {
    /// Workload name.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// Desired replica count.
    pub replicas: u32,
}

impl WorkloadInfo {
    /// Create a workload description.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, replicas: u32) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            replicas,
        }
    }
}

/// A structured backup request.
///
/// Adapters serialize this into whatever their backup system expects; the
/// lifecycle code never assembles manifests by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// Unique backup name.
    pub name: BackupId,
    /// How long the backup is retained.
    pub ttl: Duration,
    /// Namespaces whose resources are captured.
    pub include_namespaces: Vec<String>,
    /// Whether persistent volumes are snapshotted.
    pub snapshot_volumes: bool,
    /// Labels attached to the backup object.
    pub labels: BTreeMap<String, String>,
}

impl BackupRequest {
    /// Default retention for pre-stop backups (7 days).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(168 * 3600);

    /// Build a pre-stop backup request with the default retention and volume
    /// snapshots enabled.
    #[must_use]
    pub fn pre_stop(name: BackupId, include_namespaces: Vec<String>) -> Self {
        let labels = BTreeMap::from([
            ("backup-type".to_string(), "pre-stop".to_string()),
            ("automated".to_string(), "true".to_string()),
        ]);
        Self {
            name,
            ttl: Self::DEFAULT_TTL,
            include_namespaces,
            snapshot_volumes: true,
            labels,
        }
    }
}

/// Azure settings needed to scale AKS node pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    /// Subscription that owns the cluster.
    pub subscription_id: String,
    /// Resource group of the managed cluster.
    pub resource_group: String,
    /// Managed cluster name.
    pub cluster_name: String,
    /// Bearer token for the Resource Manager API.
    pub access_token: String,
    /// Resource Manager endpoint.
    pub management_url: String,
}

impl AzureConfig {
    /// Public Azure Resource Manager endpoint.
    pub const DEFAULT_MANAGEMENT_URL: &'static str = "https://management.azure.com";

    /// Load Azure settings from the environment.
    ///
    /// Returns `None` unless `AZURE_SUBSCRIPTION_ID`, `AZURE_RESOURCE_GROUP`,
    /// `AKS_CLUSTER_NAME` and `AZURE_ACCESS_TOKEN` are all set.
    /// `AZURE_MANAGEMENT_URL` optionally overrides the endpoint.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Some(Self {
            subscription_id: std::env::var("AZURE_SUBSCRIPTION_ID").ok()?,
            resource_group: std::env::var("AZURE_RESOURCE_GROUP").ok()?,
            cluster_name: std::env::var("AKS_CLUSTER_NAME").ok()?,
            access_token: std::env::var("AZURE_ACCESS_TOKEN").ok()?,
            management_url: std::env::var("AZURE_MANAGEMENT_URL")
                .unwrap_or_else(|_| Self::DEFAULT_MANAGEMENT_URL.to_string()),
        })
    }
}

/// Configuration for the Kubernetes control-plane adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Namespace where backup objects are created.
    pub backup_namespace: String,
    /// Backup storage location name.
    pub backup_storage_location: String,
    /// Cloud settings for node pool scaling, if available.
    pub azure: Option<AzureConfig>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            backup_namespace: "dataprotection-microsoft".to_string(),
            backup_storage_location: "default".to_string(),
            azure: None,
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `OFFHOURS_BACKUP_NAMESPACE`: namespace for backup objects
    /// - `OFFHOURS_BACKUP_STORAGE_LOCATION`: backup storage location
    /// - Azure variables, see [`AzureConfig::from_env`]
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("OFFHOURS_BACKUP_NAMESPACE") {
            config.backup_namespace = val;
        }
        if let Ok(val) = std::env::var("OFFHOURS_BACKUP_STORAGE_LOCATION") {
            config.backup_storage_location = val;
        }
        config.azure = AzureConfig::from_env();

        config
    }
}

//! Kubernetes control-plane implementation.
//!
//! This module provides the [`ControlPlaneClient`] capability trait and the
//! [`KubeControlPlane`] adapter that talks to a real cluster: deployments for
//! workload scaling, Velero for backups, and the AKS API for node pools.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::node_pool::AksNodePoolClient;
use crate::types::{BackupRequest, ClusterConfig, WorkloadInfo};
use crate::velero::{backup_api_resource, build_backup};
use crate::{ClusterError, Result};

/// The capabilities the lifecycle code needs from the cluster.
///
/// Every call may fail; callers decide whether a failure is fatal.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// List the scalable workloads in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the workloads cannot be enumerated.
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadInfo>>;

    /// Set a workload's replica count.
    ///
    /// # Errors
    ///
    /// Returns an error if the scale request fails.
    async fn scale_workload(&self, name: &str, namespace: &str, replicas: u32) -> Result<()>;

    /// Set a node pool's node count.
    ///
    /// # Errors
    ///
    /// Returns an error if node pool scaling is unavailable or fails.
    async fn scale_node_pool(&self, pool_name: &str, node_count: u32) -> Result<()>;

    /// Submit a backup request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup system rejects the request.
    async fn submit_backup(&self, request: &BackupRequest) -> Result<()>;
}

/// Control plane backed by the Kubernetes API and the AKS management API.
pub struct KubeControlPlane {
    client: Client,
    config: ClusterConfig,
    node_pools: Option<AksNodePoolClient>,
}

impl KubeControlPlane {
    /// Create a new control plane adapter.
    ///
    /// This will attempt to connect to the cluster using in-cluster config
    /// or kubeconfig file.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes or HTTP client cannot be created.
    pub async fn new(config: ClusterConfig) -> Result<Self> {
        let client = Client::try_default().await?;
        Self::with_client(client, config)
    }

    /// Create an adapter with a pre-configured Kubernetes client.
    ///
    /// # Errors
    ///
    /// Returns an error if the node pool HTTP client cannot be created.
    pub fn with_client(client: Client, config: ClusterConfig) -> Result<Self> {
        let node_pools = config
            .azure
            .clone()
            .map(AksNodePoolClient::new)
            .transpose()?;

        Ok(Self {
            client,
            config,
            node_pools,
        })
    }

    /// Get a reference to the adapter config.
    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    fn deployments_api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn workload_info(deployment: &Deployment, namespace: &str) -> Option<WorkloadInfo> {
        let name = deployment.metadata.name.clone()?;
        // An unset replica count means the API server default of 1.
        let replicas = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1);

        Some(WorkloadInfo {
            name,
            namespace: deployment
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_string()),
            replicas: u32::try_from(replicas).unwrap_or(0),
        })
    }
}

#[async_trait]
impl ControlPlaneClient for KubeControlPlane {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
        let deployments = self
            .deployments_api(namespace)
            .list(&ListParams::default())
            .await?;

        let workloads: Vec<_> = deployments
            .items
            .iter()
            .filter_map(|d| Self::workload_info(d, namespace))
            .collect();

        debug!(namespace, count = workloads.len(), "Listed deployments");
        Ok(workloads)
    }

    async fn scale_workload(&self, name: &str, namespace: &str, replicas: u32) -> Result<()> {
        let patch = json!({ "spec": { "replicas": replicas } });

        match self
            .deployments_api(namespace)
            .patch_scale(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                debug!(workload = name, namespace, replicas, "Patched deployment scale");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Err(ClusterError::WorkloadNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn scale_node_pool(&self, pool_name: &str, node_count: u32) -> Result<()> {
        let node_pools = self
            .node_pools
            .as_ref()
            .ok_or(ClusterError::NodePoolNotConfigured)?;
        node_pools.scale(pool_name, node_count).await
    }

    async fn submit_backup(&self, request: &BackupRequest) -> Result<()> {
        let ar = backup_api_resource();
        let backups: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &self.config.backup_namespace, &ar);

        let backup = build_backup(request, &self.config);
        backups.create(&PostParams::default(), &backup).await?;

        info!(
            backup = %request.name,
            namespace = %self.config.backup_namespace,
            "Created backup object"
        );
        Ok(())
    }
}

/// A mock control plane for testing without a real cluster.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashSet};

    /// A control-plane call, recorded in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ControlPlaneCall {
        /// `list_workloads`.
        ListWorkloads {
            /// Namespace listed.
            namespace: String,
        },
        /// `scale_workload`.
        ScaleWorkload {
            /// Workload name.
            name: String,
            /// Workload namespace.
            namespace: String,
            /// Requested replicas.
            replicas: u32,
        },
        /// `scale_node_pool`.
        ScaleNodePool {
            /// Pool name.
            pool: String,
            /// Requested node count.
            node_count: u32,
        },
        /// `submit_backup`.
        SubmitBackup {
            /// Backup name.
            name: String,
        },
    }

    /// A control plane that keeps deployments and node pools in memory.
    #[derive(Default)]
    pub struct MockControlPlane {
        inner: Mutex<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        workloads: Vec<WorkloadInfo>,
        node_pools: BTreeMap<String, u32>,
        backups: Vec<BackupRequest>,
        calls: Vec<ControlPlaneCall>,
        fail_list: bool,
        fail_backup: bool,
        fail_node_pool: bool,
        fail_scales: HashSet<(String, u32)>,
    }

    impl MockControlPlane {
        /// Create an empty mock control plane.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock with the given workloads, in list order.
        #[must_use]
        pub fn with_workloads(workloads: impl IntoIterator<Item = WorkloadInfo>) -> Self {
            let mock = Self::new();
            mock.inner.lock().workloads = workloads.into_iter().collect();
            mock
        }

        /// Add a node pool with an initial node count.
        pub fn add_node_pool(&self, pool: &str, node_count: u32) {
            self.inner.lock().node_pools.insert(pool.to_string(), node_count);
        }

        /// Make `list_workloads` fail.
        pub fn fail_list(&self, fail: bool) {
            self.inner.lock().fail_list = fail;
        }

        /// Make `submit_backup` fail.
        pub fn fail_backup(&self, fail: bool) {
            self.inner.lock().fail_backup = fail;
        }

        /// Make `scale_node_pool` fail.
        pub fn fail_node_pool(&self, fail: bool) {
            self.inner.lock().fail_node_pool = fail;
        }

        /// Make scaling `name` to exactly `replicas` fail.
        pub fn fail_scale_to(&self, name: &str, replicas: u32) {
            self.inner
                .lock()
                .fail_scales
                .insert((name.to_string(), replicas));
        }

        /// Current replica count of a workload.
        #[must_use]
        pub fn replicas(&self, name: &str) -> Option<u32> {
            self.inner
                .lock()
                .workloads
                .iter()
                .find(|w| w.name == name)
                .map(|w| w.replicas)
        }

        /// Current node count of a pool.
        #[must_use]
        pub fn node_count(&self, pool: &str) -> Option<u32> {
            self.inner.lock().node_pools.get(pool).copied()
        }

        /// Backups submitted so far.
        #[must_use]
        pub fn backups(&self) -> Vec<BackupRequest> {
            self.inner.lock().backups.clone()
        }

        /// Every call made so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<ControlPlaneCall> {
            self.inner.lock().calls.clone()
        }

        /// Only the `scale_workload` calls, as `(name, replicas)`.
        #[must_use]
        pub fn scale_calls(&self) -> Vec<(String, u32)> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|c| match c {
                    ControlPlaneCall::ScaleWorkload { name, replicas, .. } => {
                        Some((name.clone(), *replicas))
                    }
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ControlPlaneClient for MockControlPlane {
        async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadInfo>> {
            let mut inner = self.inner.lock();
            inner.calls.push(ControlPlaneCall::ListWorkloads {
                namespace: namespace.to_string(),
            });
            if inner.fail_list {
                return Err(ClusterError::Rejected("list workloads failed".to_string()));
            }
            Ok(inner
                .workloads
                .iter()
                .filter(|w| w.namespace == namespace)
                .cloned()
                .collect())
        }

        async fn scale_workload(&self, name: &str, namespace: &str, replicas: u32) -> Result<()> {
            let mut inner = self.inner.lock();
            inner.calls.push(ControlPlaneCall::ScaleWorkload {
                name: name.to_string(),
                namespace: namespace.to_string(),
                replicas,
            });
            if inner.fail_scales.contains(&(name.to_string(), replicas)) {
                return Err(ClusterError::Rejected(format!(
                    "scale {name} to {replicas} failed"
                )));
            }
            let workload = inner
                .workloads
                .iter_mut()
                .find(|w| w.name == name && w.namespace == namespace)
                .ok_or_else(|| ClusterError::WorkloadNotFound {
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                })?;
            workload.replicas = replicas;
            Ok(())
        }

        async fn scale_node_pool(&self, pool_name: &str, node_count: u32) -> Result<()> {
            let mut inner = self.inner.lock();
            inner.calls.push(ControlPlaneCall::ScaleNodePool {
                pool: pool_name.to_string(),
                node_count,
            });
            if inner.fail_node_pool {
                return Err(ClusterError::NodePoolNotConfigured);
            }
            inner.node_pools.insert(pool_name.to_string(), node_count);
            Ok(())
        }

        async fn submit_backup(&self, request: &BackupRequest) -> Result<()> {
            let mut inner = self.inner.lock();
            inner.calls.push(ControlPlaneCall::SubmitBackup {
                name: request.name.to_string(),
            });
            if inner.fail_backup {
                return Err(ClusterError::Rejected("backup storage unavailable".to_string()));
            }
            inner.backups.push(request.clone());
            Ok(())
        }
    }
}

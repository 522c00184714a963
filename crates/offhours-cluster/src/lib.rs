//! Control-plane adapters for offhours.
//!
//! This crate provides the [`ControlPlaneClient`] trait, the capability
//! boundary between the lifecycle state machine and the outside world, and
//! its [`KubeControlPlane`] implementation:
//!
//! - Workload listing and scaling through the Kubernetes deployments API
//! - Pre-stop backups as Velero `Backup` objects
//! - Node pool scaling through the Azure Resource Manager API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     LifecycleController                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      KubeControlPlane                           │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────────┐   │
//! │  │ Deployments │ │   Velero    │ │   AKS node pools        │   │
//! │  │ (scale)     │ │   Backups   │ │   (Resource Manager)    │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//!                │                 │                  │
//!                ▼                 ▼                  ▼
//!        Kubernetes API     Kubernetes API     management.azure.com
//! ```
//!
//! # Testing
//!
//! For testing without a cluster, enable the `test-utils` feature and use
//! the mock control plane:
//!
//! ```ignore
//! use offhours_cluster::{ControlPlaneClient, MockControlPlane, WorkloadInfo};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = MockControlPlane::with_workloads([WorkloadInfo::new("web", "default", 2)]);
//! cluster.scale_workload("web", "default", 0).await?;
//! assert_eq!(cluster.replicas("web"), Some(0));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod k8s;
pub mod node_pool;
pub mod types;
pub mod velero;

pub use error::{ClusterError, Result};
pub use k8s::{ControlPlaneClient, KubeControlPlane};
pub use node_pool::AksNodePoolClient;
pub use types::{AzureConfig, BackupRequest, ClusterConfig, WorkloadInfo};

#[cfg(any(test, feature = "test-utils"))]
pub use k8s::mock::{ControlPlaneCall, MockControlPlane};

//! Lifecycle control for offhours.
//!
//! This crate owns the cluster's off-hours state machine: the stop and start
//! sequences, the pre-stop backup, and the daily scheduler that triggers
//! them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Scheduler (poll loop)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ stop / start
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LifecycleController                      │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │   Backup    │ │  Stop/Start │ │    Lifecycle        │   │
//! │  │ Coordinator │ │  Sequences  │ │    State Machine    │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!        ┌──────────────┐             ┌──────────────┐
//!        │  StateStore  │             │ ControlPlane │
//!        │   (files)    │             │ (K8s, Azure) │
//!        └──────────────┘             └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use offhours_cluster::{ClusterConfig, KubeControlPlane};
//! use offhours_control::{LifecycleConfig, LifecycleController, StopOutcome};
//! use offhours_store::FileStateStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = Arc::new(KubeControlPlane::new(ClusterConfig::from_env()).await?);
//! let store = Arc::new(FileStateStore::open("/var/lib/offhours/aks-demo")?);
//! let controller = LifecycleController::new(cluster, store, LifecycleConfig::default());
//!
//! if let StopOutcome::Stopped(report) = controller.stop().await? {
//!     println!("scaled {} workloads", report.scaled);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # State Machine
//!
//! - `Running` → `Stopping` on the stop trigger
//! - `Stopping` → `Stopped` once the stop state is persisted, or back to
//!   `Running` if workloads cannot be listed
//! - `Stopped` → `Starting` on the start trigger
//! - `Starting` → `Running` once the stop state is cleared
//!
//! Triggers arriving while a sequence is in flight are rejected. See the
//! [`lifecycle`] module.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backup;
pub mod clock;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod scheduler;
pub mod shutdown;
pub mod status;
pub mod types;

pub use backup::BackupCoordinator;
pub use clock::{Clock, SystemClock};
pub use controller::LifecycleController;
pub use error::{LifecycleError, Result};
pub use lifecycle::{ClusterLifecycleState, Trigger};
pub use scheduler::{FiredGuard, Scheduler};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use status::{query_status, ClusterStatus};
pub use types::{
    LifecycleConfig, NodePoolConfig, ScaleFailure, ScaleTarget, StartOutcome, StartReport,
    StopOutcome, StopReport,
};

#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;

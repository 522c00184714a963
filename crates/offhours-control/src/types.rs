//! Configuration and report types for lifecycle sequences.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use offhours_core::{BackupId, ScheduleConfig};
use offhours_store::StopRecord;
use serde::Serialize;

/// A node pool scaled alongside the workloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePoolConfig {
    /// Agent pool name.
    pub name: String,
    /// Node count restored by the start sequence.
    pub restore_count: u32,
}

impl NodePoolConfig {
    /// Create a node pool configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, restore_count: u32) -> Self {
        Self {
            name: name.into(),
            restore_count,
        }
    }
}

/// Configuration for the lifecycle controller and scheduler.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Namespace whose workloads are managed.
    pub namespace: String,
    /// Daily stop/start times.
    pub schedule: ScheduleConfig,
    /// Optional node pool scaled after workloads on stop and before them on start.
    pub node_pool: Option<NodePoolConfig>,
    /// Wait after restoring replicas before the start sequence completes.
    pub settle_grace: Duration,
    /// Scheduler tick interval.
    pub poll_interval: Duration,
}

impl LifecycleConfig {
    /// Default settle grace period.
    pub const DEFAULT_SETTLE_GRACE: Duration = Duration::from_secs(120);
    /// Default scheduler poll interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

    /// Create a configuration for `namespace` with default timings.
    #[must_use]
    pub fn new(namespace: impl Into<String>, schedule: ScheduleConfig) -> Self {
        Self {
            namespace: namespace.into(),
            schedule,
            ..Self::default()
        }
    }

    /// Scale `pool` alongside the workloads.
    #[must_use]
    pub fn with_node_pool(mut self, pool: NodePoolConfig) -> Self {
        self.node_pool = Some(pool);
        self
    }

    /// Override the settle grace period.
    #[must_use]
    pub const fn with_settle_grace(mut self, grace: Duration) -> Self {
        self.settle_grace = grace;
        self
    }

    /// Override the scheduler poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            schedule: ScheduleConfig::default(),
            node_pool: None,
            settle_grace: Self::DEFAULT_SETTLE_GRACE,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a failed scale call targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleTarget {
    /// A workload.
    Workload {
        /// Workload name.
        name: String,
        /// Workload namespace.
        namespace: String,
    },
    /// A node pool.
    NodePool {
        /// Pool name.
        name: String,
    },
}

impl fmt::Display for ScaleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workload { name, namespace } => write!(f, "{namespace}/{name}"),
            Self::NodePool { name } => write!(f, "node pool {name}"),
        }
    }
}

/// A scale call that failed without aborting its sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleFailure {
    /// The scaled object.
    pub target: ScaleTarget,
    /// The requested count.
    pub replicas: u32,
    /// The control-plane error message.
    pub error: String,
}

impl ScaleFailure {
    pub(crate) fn workload(name: &str, namespace: &str, replicas: u32, error: impl fmt::Display) -> Self {
        Self {
            target: ScaleTarget::Workload {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            replicas,
            error: error.to_string(),
        }
    }

    pub(crate) fn node_pool(name: &str, node_count: u32, error: impl fmt::Display) -> Self {
        Self {
            target: ScaleTarget::NodePool {
                name: name.to_string(),
            },
            replicas: node_count,
            error: error.to_string(),
        }
    }
}

impl fmt::Display for ScaleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.target, self.replicas, self.error)
    }
}

/// Result of a completed stop sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    /// When the stop record was written.
    pub stopped_at: DateTime<Utc>,
    /// The pre-stop backup, if one was obtained.
    pub backup_id: Option<BackupId>,
    /// Workloads recorded in the snapshot.
    pub recorded: usize,
    /// Workloads successfully scaled to zero.
    pub scaled: usize,
    /// Scale calls that failed.
    pub failures: Vec<ScaleFailure>,
    /// Shutdown cut the sequence short.
    pub interrupted: bool,
}

impl StopReport {
    /// Whether the stop completed with a missing backup or scale failures.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.backup_id.is_none() || !self.failures.is_empty() || self.interrupted
    }
}

/// Result of a start sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    /// The stop record the sequence restored from.
    pub stopped_at: DateTime<Utc>,
    /// The backup taken before the stop, if any.
    pub backup_id: Option<BackupId>,
    /// Workloads successfully scaled back up.
    pub restored: usize,
    /// Scale calls that failed.
    pub failures: Vec<ScaleFailure>,
}

impl StartReport {
    pub(crate) fn from_record(record: &StopRecord) -> Self {
        Self {
            stopped_at: record.stopped_at,
            backup_id: record.backup_id.clone(),
            restored: 0,
            failures: Vec::new(),
        }
    }

    /// Whether any scale call failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Outcome of a stop trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StopOutcome {
    /// A stop record already existed; nothing was done.
    AlreadyStopped {
        /// The existing record.
        record: StopRecord,
    },
    /// The stop sequence ran.
    Stopped(StopReport),
    /// Shutdown arrived before any workload was scaled; nothing was persisted.
    #[serde(rename_all = "camelCase")]
    Interrupted {
        /// The pre-stop backup, if one was submitted before the shutdown.
        backup_id: Option<BackupId>,
    },
}

/// Outcome of a start trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// No stop state existed; nothing to restore.
    AlreadyRunning,
    /// Replicas were restored and the stop state cleared.
    Started(StartReport),
    /// Shutdown cut the sequence short; the stop state was kept.
    Interrupted(StartReport),
}

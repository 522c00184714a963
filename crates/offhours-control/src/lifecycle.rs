//! Cluster lifecycle state machine.
//!
//! The lifecycle state is never persisted directly. `Running` and `Stopped`
//! are derived from the stored records; `Stopping` and `Starting` exist only
//! in memory while a sequence executes.
//!
//! # State Machine
//!
//! ```text
//!        ┌──────────┐   stop    ┌──────────┐
//!        │ Running  │──────────▶│ Stopping │
//!        └──────────┘           └────┬─────┘
//!             ▲   ▲   (list failed)  │
//!             │   └──────────────────┤
//!             │                      ▼
//!        ┌────┴─────┐   start   ┌──────────┐
//!        │ Starting │◀──────────│ Stopped  │
//!        └────┬─────┘           └──────────┘
//!             │    (failed)           ▲
//!             └───────────────────────┘
//! ```

use std::fmt;

use offhours_store::PersistedStopState;
use serde::Serialize;

use crate::error::{LifecycleError, Result};

/// Lifecycle state of the managed cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLifecycleState {
    /// Workloads run at their normal capacity.
    Running,
    /// A stop sequence is executing.
    Stopping,
    /// Workloads are scaled down and a stop record exists.
    Stopped,
    /// A start sequence is executing.
    Starting,
}

impl ClusterLifecycleState {
    /// Whether a sequence is currently executing.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Stopping | Self::Starting)
    }
}

impl fmt::Display for ClusterLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
        };
        f.write_str(name)
    }
}

/// The two triggers the scheduler and CLI can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Run the stop sequence.
    Stop,
    /// Run the start sequence.
    Start,
}

impl Trigger {
    /// The transient state entered while this trigger's sequence runs.
    #[must_use]
    pub const fn transient_state(self) -> ClusterLifecycleState {
        match self {
            Self::Stop => ClusterLifecycleState::Stopping,
            Self::Start => ClusterLifecycleState::Starting,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("stop"),
            Self::Start => f.write_str("start"),
        }
    }
}

/// Derive the settled state from what is persisted.
///
/// Returns `None` when only the workload snapshot exists, which matches
/// neither `Running` nor `Stopped`.
#[must_use]
pub const fn persisted_state(persisted: &PersistedStopState) -> Option<ClusterLifecycleState> {
    match persisted {
        PersistedStopState::Absent => Some(ClusterLifecycleState::Running),
        PersistedStopState::Complete { .. } | PersistedStopState::RecordOnly(_) => {
            Some(ClusterLifecycleState::Stopped)
        }
        PersistedStopState::SnapshotOnly(_) => None,
    }
}

/// Check whether a trigger may begin.
///
/// Triggers are rejected only while another sequence is in flight; a stop
/// while stopped or a start while running is an idempotent no-op handled by
/// the sequence itself.
///
/// # Errors
///
/// Returns `LifecycleError::SequenceInFlight` if a sequence is running.
pub fn begin_sequence(
    in_flight: Option<ClusterLifecycleState>,
    trigger: Trigger,
) -> Result<ClusterLifecycleState> {
    match in_flight {
        Some(current) => Err(LifecycleError::SequenceInFlight(current)),
        None => Ok(trigger.transient_state()),
    }
}

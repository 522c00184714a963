//! Error types for the lifecycle controller.
//!
//! Only conditions that change the overall outcome of a sequence to failure
//! are errors here. Per-workload scale failures and backup failures are
//! collected into the sequence report instead.

use offhours_cluster::ClusterError;
use thiserror::Error;

use crate::lifecycle::ClusterLifecycleState;

/// A result type using `LifecycleError`.
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Errors that abort a lifecycle sequence.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Workloads could not be enumerated, so no stop progress was possible.
    #[error("failed to list workloads in namespace {namespace}: {source}")]
    ListWorkloads {
        /// The managed namespace.
        namespace: String,
        /// The control-plane error.
        #[source]
        source: ClusterError,
    },

    /// Exactly one of the workload snapshot and stop record is persisted.
    #[error(
        "inconsistent stop state (workload snapshot {}, stop record {}): manual reconciliation required",
        presence(*has_snapshot),
        presence(*has_record)
    )]
    InconsistentState {
        /// Whether the workload snapshot exists.
        has_snapshot: bool,
        /// Whether the stop record exists.
        has_record: bool,
    },

    /// Another sequence is already running.
    #[error("a lifecycle sequence is already in flight (cluster is {0})")]
    SequenceInFlight(ClusterLifecycleState),

    /// Persisting or clearing state failed.
    #[error("state store error: {0}")]
    Store(#[from] offhours_store::StoreError),
}

const fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "missing"
    }
}

impl LifecycleError {
    /// Process exit code for this error.
    ///
    /// `1` for fatal aborts, `2` for rejected triggers, `3` for inconsistent
    /// state.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ListWorkloads { .. } | Self::Store(_) => 1,
            Self::SequenceInFlight(_) => 2,
            Self::InconsistentState { .. } => 3,
        }
    }

    /// Returns true if an operator has to repair persisted state by hand.
    #[must_use]
    pub const fn needs_manual_intervention(&self) -> bool {
        matches!(self, Self::InconsistentState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let list = LifecycleError::ListWorkloads {
            namespace: "default".to_string(),
            source: ClusterError::Rejected("boom".to_string()),
        };
        assert_eq!(list.exit_code(), 1);
        assert_eq!(
            LifecycleError::SequenceInFlight(ClusterLifecycleState::Stopping).exit_code(),
            2
        );
        let inconsistent = LifecycleError::InconsistentState {
            has_snapshot: false,
            has_record: true,
        };
        assert_eq!(inconsistent.exit_code(), 3);
        assert!(inconsistent.needs_manual_intervention());
        assert!(!list.needs_manual_intervention());
    }

    #[test]
    fn inconsistent_message_names_missing_record() {
        let err = LifecycleError::InconsistentState {
            has_snapshot: false,
            has_record: true,
        };
        assert_eq!(
            err.to_string(),
            "inconsistent stop state (workload snapshot missing, stop record present): manual reconciliation required"
        );
    }
}

//! Error types for the cluster crate.

use thiserror::Error;

/// Errors returned by control-plane operations.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    /// The named workload does not exist.
    #[error("Workload not found: {namespace}/{name}")]
    WorkloadNotFound {
        /// Workload name.
        name: String,
        /// Workload namespace.
        namespace: String,
    },

    /// Node pool scaling was requested without cloud provider settings.
    #[error("Node pool scaling is not configured (missing Azure subscription, resource group or cluster name)")]
    NodePoolNotConfigured,

    /// Transport failure talking to the cloud provider.
    #[error("Cloud API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The cloud provider rejected a request.
    #[error("Cloud API returned {status}: {message}")]
    CloudApi {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// The control plane refused the operation.
    #[error("Operation rejected: {0}")]
    Rejected(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClusterError {
    /// Check if this error is retriable.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::KubeApi(_) | Self::Http(_) => true,
            Self::CloudApi { status, .. } => *status == 429 || *status >= 500,
            Self::WorkloadNotFound { .. }
            | Self::NodePoolNotConfigured
            | Self::Rejected(_)
            | Self::Config(_) => false,
        }
    }
}

/// A specialized Result type for control-plane operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_errors() {
        assert!(ClusterError::CloudApi {
            status: 503,
            message: String::new()
        }
        .is_retriable());
        assert!(ClusterError::CloudApi {
            status: 429,
            message: String::new()
        }
        .is_retriable());
        assert!(!ClusterError::CloudApi {
            status: 403,
            message: String::new()
        }
        .is_retriable());
        assert!(!ClusterError::NodePoolNotConfigured.is_retriable());
        assert!(!ClusterError::Rejected("no".to_string()).is_retriable());
    }
}

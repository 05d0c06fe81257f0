//! Error types for the workload crate.

use thiserror::Error;

/// Result type alias for workload supervisor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Workload supervisor error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The named service is not in the current service layer.
    #[error("service '{service}' is not defined in the current layer")]
    ServiceNotFound { service: String },

    /// Spawning a service process failed.
    #[error("failed to spawn service '{service}': {reason}")]
    SpawnFailed { service: String, reason: String },

    /// A one-shot service run exited unsuccessfully.
    #[error("one-shot service '{service}' failed: {reason}")]
    OneShotFailed { service: String, reason: String },

    /// Stopping a running service failed.
    #[error("failed to stop service '{service}': {reason}")]
    StopFailed { service: String, reason: String },

    /// Placing a file into the workload filesystem failed.
    #[error("failed to push file '{path}': {reason}")]
    PushFailed { path: String, reason: String },

    /// Writing the supervisor's plan snapshot failed.
    #[error("failed to persist the service plan to '{path}': {reason}")]
    PersistFailed { path: String, reason: String },
}

impl Error {
    /// Create a service-not-found error.
    pub fn service_not_found(service: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            service: service.into(),
        }
    }

    /// Create a spawn error.
    pub fn spawn_failed(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a one-shot failure error.
    pub fn one_shot_failed(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OneShotFailed {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a stop error.
    pub fn stop_failed(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a push error.
    pub fn push_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PushFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a plan persistence error.
    pub fn persist_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PersistFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::one_shot_failed("install-drupal", "exit status 1");
        assert!(err.to_string().contains("install-drupal"));
        assert!(err.to_string().contains("exit status 1"));
    }
}

//! Error types for the operator crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for operator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types.
#[derive(Debug, Error)]
pub enum Error {
    /// State store failure.
    #[error("state store error: {0}")]
    State(#[from] drupal_state::Error),

    /// Workload supervisor failure. Propagated so the orchestrator
    /// retries the event; status is left stale until then.
    #[error("workload supervisor error: {0}")]
    Workload(#[from] drupal_workload::Error),

    /// The state store has never been initialized.
    #[error("operator state has not been initialized")]
    StateUninitialized,

    /// Reading the config file failed.
    #[error("failed to read config file '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    /// The config file is not valid TOML.
    #[error("invalid config file '{path}': {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },
}

impl Error {
    /// Create a config read error.
    pub fn config_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config parse error.
    pub fn config_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
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
        let err = Error::config_invalid("/etc/op/config.toml", "expected a table");
        assert!(err.to_string().contains("config.toml"));
        assert!(err.to_string().contains("expected a table"));
    }
}

//! Externally visible operator status.

use std::fmt;
use std::sync::Mutex;

/// Blocked message while no usable database primary is known.
pub const WAITING_FOR_DATABASE: &str = "Waiting for relation with the database";

/// Maintenance message while the one-shot installation runs.
pub const INSTALLING: &str = "Installing Drupal...";

/// Blocked message for the install-already-running invariant violation.
pub const INSTALL_ALREADY_RUNNING: &str =
    "`install-drupal` service is running, this is not expected";

/// Status reported to the orchestrator. The message text is part of the
/// observable contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Workload is installed and serving.
    Active,
    /// A long-running maintenance step is in progress.
    Maintenance(String),
    /// Waiting on a dependency or operator intervention.
    Blocked(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Maintenance(msg) => write!(f, "maintenance: {msg}"),
            Self::Blocked(msg) => write!(f, "blocked: {msg}"),
        }
    }
}

/// Sink for status transitions.
///
/// The engine reports transient states (maintenance during the install
/// run) as well as the final status of a pass, so the orchestrator sees
/// the same sequence the workload went through.
pub trait StatusReporter: Send + Sync {
    /// Report a status transition.
    fn report(&self, status: &Status);
}

/// Reporter that logs transitions through `tracing`.
#[derive(Debug, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, status: &Status) {
        tracing::info!(%status, "status");
    }
}

/// Reporter that records every transition, for tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    seen: Mutex<Vec<Status>>,
}

impl RecordingReporter {
    /// Create a new recording reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All reported statuses, in order.
    pub fn seen(&self) -> Vec<Status> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, status: &Status) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(status.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Status::Active.to_string(), "active");
        assert_eq!(
            Status::Blocked(WAITING_FOR_DATABASE.to_string()).to_string(),
            "blocked: Waiting for relation with the database"
        );
        assert_eq!(
            Status::Maintenance(INSTALLING.to_string()).to_string(),
            "maintenance: Installing Drupal..."
        );
    }

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.report(&Status::Maintenance(INSTALLING.to_string()));
        reporter.report(&Status::Active);
        assert_eq!(
            reporter.seen(),
            vec![Status::Maintenance(INSTALLING.to_string()), Status::Active]
        );
    }
}

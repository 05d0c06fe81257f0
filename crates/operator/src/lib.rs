//! Lifecycle operator for a containerized Drupal workload.
//!
//! The operator reconciles observed state (workload run-state, database
//! relation, user configuration) into actions: install the site, start
//! or stop the service, or block waiting on a dependency. The decision
//! logic lives in [`engine`]; everything else is plumbing around it:
//!
//! - [`relation`]: database relation negotiation and the name guard
//! - [`conninfo`]: libpq connection string parsing
//! - [`layer`]: service layer construction and install artifacts
//! - [`operator`]: one handler per orchestrator event
//! - [`status`]: the externally visible status contract

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod conninfo;
pub mod engine;
pub mod error;
pub mod layer;
pub mod operator;
pub mod relation;
pub mod status;

// Re-export main types
pub use config::OperatorConfig;
pub use engine::{plan, Plan, Reconciler};
pub use error::{Error, Result};
pub use operator::{Event, Operator, Outcome};
pub use relation::{DatabaseRequest, JoinOutcome, PrimaryConnection, DATABASE_NAME};
pub use status::{
    LogReporter, RecordingReporter, Status, StatusReporter, INSTALLING,
    INSTALL_ALREADY_RUNNING, WAITING_FOR_DATABASE,
};

//! Declarative service layer and workload supervisor interface.
//!
//! The operator drives its workload through two pieces:
//!
//! - [`ServiceLayer`]: a declarative map of named services (command,
//!   startup policy, override semantics, ordering, environment) merged
//!   into the supervisor's plan.
//! - [`WorkloadController`]: the trait seam to the process supervisor
//!   (push files, apply layers, query run-state, start/stop, run
//!   one-shot services to completion).
//!
//! [`InMemoryWorkload`] records every call for tests;
//! [`LocalProcessWorkload`] runs services as local child processes.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod controller;
pub mod error;
pub mod layer;
pub mod process;

// Re-export main types
pub use controller::{Call, InMemoryWorkload, WorkloadController};
pub use error::{Error, Result};
pub use layer::{Override, ServiceLayer, ServiceSpec, Startup};
pub use process::LocalProcessWorkload;

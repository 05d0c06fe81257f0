//! Persistent state for the Drupal workload operator.
//!
//! One durable record backs the whole controller: the installed latch,
//! the primary database connection, the replica URIs and the admin
//! password. The record survives controller restarts behind the
//! [`StateStore`] trait; [`FileStateStore`] is the production backend
//! (crash-consistent JSON writes) and [`InMemoryStateStore`] the test
//! fake.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod password;
pub mod state;
pub mod store;

// Re-export main types
pub use error::{Error, Result};
pub use password::{generate_password, GENERATED_PASSWORD_LEN};
pub use state::PersistentState;
pub use store::{FileStateStore, InMemoryStateStore, StateStore};

//! Database relation types and negotiation rules.
//!
//! Relation negotiation is asynchronous: a non-leader unit can observe
//! a primary-changed event before the leader has declared which
//! database it wants. Every stateful handler therefore guards on the
//! expected database name and ignores events for anything else.

use serde::{Deserialize, Serialize};

/// Logical database name this operator requests from the relation.
pub const DATABASE_NAME: &str = "drupal";

/// Extensions the leader requests alongside the database.
pub const DATABASE_EXTENSIONS: &[&str] = &["citext:public"];

/// Primary connection details delivered by the relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryConnection {
    /// libpq keyword/value connection string.
    pub conn_str: String,
    /// URI form of the same connection.
    pub uri: String,
}

/// Requirements the leader declares when the relation is first joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRequest {
    /// Requested database name.
    pub database: String,
    /// Requested extensions, `name:schema` form.
    pub extensions: Vec<String>,
}

impl DatabaseRequest {
    /// The fixed request this operator makes.
    pub fn ours() -> Self {
        Self {
            database: DATABASE_NAME.to_string(),
            extensions: DATABASE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Result of handling a relation-joined event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// This unit is the leader: declare our requirements.
    Declare(DatabaseRequest),
    /// Negotiation is incomplete; the orchestrator must redeliver the
    /// event later (this unit may yet become leader).
    Defer,
    /// Negotiation already settled on our database; nothing to do.
    Accept,
}

/// Decide how to respond to a relation-joined event.
pub fn join_outcome(is_leader: bool, requested_database: Option<&str>) -> JoinOutcome {
    if is_leader {
        return JoinOutcome::Declare(DatabaseRequest::ours());
    }
    match requested_database {
        Some(name) if name == DATABASE_NAME => JoinOutcome::Accept,
        // Leader has not declared yet (or declared something stale).
        _ => JoinOutcome::Defer,
    }
}

/// Database-name guard shared by the primary/replica handlers.
pub fn is_expected_database(name: &str) -> bool {
    name == DATABASE_NAME
}

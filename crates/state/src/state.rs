//! The durable operator state record.

use serde::{Deserialize, Serialize};

/// Operator state that must survive controller restarts.
///
/// The record is mutated from exactly two places: the database relation
/// adapter owns the connection fields, and the reconciliation engine owns
/// the `installed` latch. `admin_password` is set once at first
/// initialization and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    /// One-way latch: set after the one-shot install run completes.
    pub installed: bool,
    /// libpq keyword/value connection string for the primary, if any.
    pub db_conn_str: Option<String>,
    /// URI form of the primary connection, if any.
    pub db_uri: Option<String>,
    /// Read-only replica URIs, in the order the relation delivered them.
    #[serde(default)]
    pub db_ro_uris: Vec<String>,
    /// Admin account password, fixed for the lifetime of the deployment.
    pub admin_password: String,
}

impl PersistentState {
    /// Create the initial state for a fresh deployment.
    pub fn new(admin_password: impl Into<String>) -> Self {
        Self {
            installed: false,
            db_conn_str: None,
            db_uri: None,
            db_ro_uris: Vec::new(),
            admin_password: admin_password.into(),
        }
    }

    /// Whether a usable primary connection is currently known.
    pub fn has_connection(&self) -> bool {
        self.db_conn_str.is_some()
    }

    /// Record (or clear) the primary connection.
    pub fn set_primary(&mut self, primary: Option<(String, String)>) {
        match primary {
            Some((conn_str, uri)) => {
                self.db_conn_str = Some(conn_str);
                self.db_uri = Some(uri);
            }
            None => {
                self.db_conn_str = None;
                self.db_uri = None;
            }
        }
    }

    /// Replace the replica URI list, preserving delivery order.
    pub fn set_replicas(&mut self, uris: Vec<String>) {
        self.db_ro_uris = uris;
    }

    /// Forget everything learned from the database relation.
    ///
    /// Leaves `installed` and `admin_password` untouched.
    pub fn clear_connection(&mut self) {
        self.db_conn_str = None;
        self.db_uri = None;
        self.db_ro_uris.clear();
    }

    /// Latch the installed flag. There is no inverse operation.
    pub fn mark_installed(&mut self) {
        self.installed = true;
    }
}

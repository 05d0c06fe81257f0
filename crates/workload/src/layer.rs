//! Declarative service layer types.
//!
//! A [`ServiceLayer`] describes named services the supervisor should
//! manage: command line, startup policy, override semantics, ordering
//! constraints and environment. Layers are recomputed on every
//! reconciliation pass and merged into the supervisor's plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a service definition combines with an existing one of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    /// Replace the prior definition entirely.
    Replace,
    /// Merge field-by-field into the prior definition.
    Merge,
}

/// Whether the supervisor starts the service automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Enabled,
    Disabled,
}

/// A single named service definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Override policy against an existing definition of the same name.
    #[serde(rename = "override")]
    pub override_policy: Override,
    /// Human-readable summary.
    pub summary: String,
    /// Command line the supervisor executes.
    pub command: String,
    /// Autostart policy.
    pub startup: Startup,
    /// Services this one must be started before.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    /// Environment passed to the service process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl ServiceSpec {
    /// Create a replace-override, startup-disabled service definition.
    pub fn new(summary: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            override_policy: Override::Replace,
            summary: summary.into(),
            command: command.into(),
            startup: Startup::Disabled,
            before: Vec::new(),
            environment: BTreeMap::new(),
        }
    }

    /// Set the override policy.
    pub fn with_override(mut self, policy: Override) -> Self {
        self.override_policy = policy;
        self
    }

    /// Set the startup policy.
    pub fn with_startup(mut self, startup: Startup) -> Self {
        self.startup = startup;
        self
    }

    /// Add an ordering constraint: this service starts before `service`.
    pub fn before(mut self, service: impl Into<String>) -> Self {
        self.before.push(service.into());
        self
    }

    /// Set the full environment map.
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Whether the supervisor should start this service on autostart.
    pub fn autostarts(&self) -> bool {
        self.startup == Startup::Enabled
    }
}

/// A named map of service definitions pushed to the supervisor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLayer {
    /// Layer summary.
    pub summary: String,
    /// Layer description.
    pub description: String,
    /// Service definitions keyed by service name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSpec>,
}

impl ServiceLayer {
    /// Create a new empty layer.
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            services: BTreeMap::new(),
        }
    }

    /// Add a service definition.
    pub fn with_service(mut self, name: impl Into<String>, spec: ServiceSpec) -> Self {
        self.services.insert(name.into(), spec);
        self
    }

    /// Get a service definition by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    /// Number of services in the layer.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the layer defines no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

//! Workload controller trait and the in-memory test fake.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::layer::{ServiceLayer, ServiceSpec};

/// Interface to the process supervisor running inside the workload.
///
/// All calls are treated as synchronous acknowledgements from the
/// controller's point of view: a reconciliation pass does not continue
/// past a call until the supervisor has acted on it.
#[async_trait]
pub trait WorkloadController: Send + Sync {
    /// Place a file into the workload filesystem with the given mode.
    /// Idempotent: pushing unchanged content is not an error.
    async fn push_file(&self, path: &str, contents: &str, mode: u32) -> Result<()>;

    /// Merge (`combine = true`) or replace the supervisor's service
    /// definitions with the given layer.
    async fn apply_layer(&self, layer: &ServiceLayer, combine: bool) -> Result<()>;

    /// Whether the named service is currently running. Services not in
    /// the plan are reported as not running.
    async fn is_running(&self, service: &str) -> Result<bool>;

    /// Start a service. Errors if the service is not defined.
    async fn start(&self, service: &str) -> Result<()>;

    /// Stop a service. Errors if the service is not defined.
    async fn stop(&self, service: &str) -> Result<()>;

    /// Run a one-shot service and wait for it to finish. Errors if the
    /// run exits unsuccessfully. Callers must check [`is_running`]
    /// first; invoking this while a prior run is still in flight is an
    /// invariant violation on the caller's side.
    ///
    /// [`is_running`]: WorkloadController::is_running
    async fn run_to_completion(&self, service: &str) -> Result<()>;

    /// Start every service declared with `startup: enabled`.
    async fn autostart(&self) -> Result<()>;
}

/// One recorded supervisor call, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PushFile { path: String, mode: u32 },
    ApplyLayer { combine: bool },
    Start { service: String },
    Stop { service: String },
    RunToCompletion { service: String },
    Autostart,
}

#[derive(Default)]
struct Inner {
    files: BTreeMap<String, (String, u32)>,
    services: BTreeMap<String, ServiceSpec>,
    running: BTreeSet<String>,
    failing_runs: BTreeSet<String>,
    calls: Vec<Call>,
}

/// In-memory workload controller for testing.
///
/// Records every call and simulates run-state so tests can assert on
/// exactly which supervisor operations a reconciliation pass issued.
#[derive(Default)]
pub struct InMemoryWorkload {
    inner: RwLock<Inner>,
}

impl InMemoryWorkload {
    /// Create a new in-memory workload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `run_to_completion` of `service` to fail.
    pub async fn fail_one_shot(&self, service: impl Into<String>) {
        self.inner.write().await.failing_runs.insert(service.into());
    }

    /// Force a service's run-state, defining it if necessary.
    pub async fn set_running(&self, service: impl Into<String>, running: bool) {
        let service = service.into();
        let mut inner = self.inner.write().await;
        inner
            .services
            .entry(service.clone())
            .or_insert_with(|| ServiceSpec::new(service.clone(), "true"));
        if running {
            inner.running.insert(service);
        } else {
            inner.running.remove(&service);
        }
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.inner.read().await.calls.clone()
    }

    /// Contents and mode of a pushed file, if present.
    pub async fn file(&self, path: &str) -> Option<(String, u32)> {
        self.inner.read().await.files.get(path).cloned()
    }

    /// The current definition of a service, if any.
    pub async fn service(&self, name: &str) -> Option<ServiceSpec> {
        self.inner.read().await.services.get(name).cloned()
    }
}

#[async_trait]
impl WorkloadController for InMemoryWorkload {
    async fn push_file(&self, path: &str, contents: &str, mode: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .files
            .insert(path.to_string(), (contents.to_string(), mode));
        inner.calls.push(Call::PushFile {
            path: path.to_string(),
            mode,
        });
        Ok(())
    }

    async fn apply_layer(&self, layer: &ServiceLayer, combine: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !combine {
            inner.services.clear();
        }
        for (name, spec) in &layer.services {
            inner.services.insert(name.clone(), spec.clone());
        }
        inner.calls.push(Call::ApplyLayer { combine });
        Ok(())
    }

    async fn is_running(&self, service: &str) -> Result<bool> {
        Ok(self.inner.read().await.running.contains(service))
    }

    async fn start(&self, service: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.services.contains_key(service) {
            return Err(Error::service_not_found(service));
        }
        inner.running.insert(service.to_string());
        inner.calls.push(Call::Start {
            service: service.to_string(),
        });
        Ok(())
    }

    async fn stop(&self, service: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.services.contains_key(service) {
            return Err(Error::service_not_found(service));
        }
        inner.running.remove(service);
        inner.calls.push(Call::Stop {
            service: service.to_string(),
        });
        Ok(())
    }

    async fn run_to_completion(&self, service: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.services.contains_key(service) {
            return Err(Error::service_not_found(service));
        }
        inner.calls.push(Call::RunToCompletion {
            service: service.to_string(),
        });
        inner.running.remove(service);
        if inner.failing_runs.remove(service) {
            return Err(Error::one_shot_failed(service, "exit status 1"));
        }
        Ok(())
    }

    async fn autostart(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let enabled: Vec<String> = inner
            .services
            .iter()
            .filter(|(_, spec)| spec.autostarts())
            .map(|(name, _)| name.clone())
            .collect();
        for name in enabled {
            debug!(service = %name, "autostarting");
            inner.running.insert(name);
        }
        inner.calls.push(Call::Autostart);
        Ok(())
    }
}

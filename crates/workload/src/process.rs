//! Child-process implementation of the workload controller.
//!
//! Runs service commands as local child processes under a root
//! directory. This stands in for a container supervisor when the
//! operator manages a workload on the same host; the trait boundary in
//! [`crate::controller`] keeps the reconciliation logic unaware of the
//! difference.
//!
//! The controller lives for a single event invocation, so the applied
//! plan and the PIDs of started services are snapshotted to a file
//! under the root and reloaded by the next invocation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layer::{ServiceLayer, ServiceSpec};
use crate::WorkloadController;

const SNAPSHOT_PATH: &str = ".drupal-operator/workload.json";

/// On-disk image of the supervisor plan, reloaded by the next invocation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    services: BTreeMap<String, ServiceSpec>,
    #[serde(default)]
    pids: BTreeMap<String, u32>,
}

struct Inner {
    services: BTreeMap<String, ServiceSpec>,
    children: HashMap<String, Child>,
    // Services started by an earlier invocation, known only by PID.
    adopted: BTreeMap<String, u32>,
}

/// Workload controller that spawns services as local child processes.
pub struct LocalProcessWorkload {
    root: PathBuf,
    inner: Mutex<Inner>,
}

// Liveness check through procfs; the supervised workload runs in Linux
// containers.
fn pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

fn load_snapshot(path: &Path) -> Snapshot {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read plan snapshot, starting empty");
            return Snapshot::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "plan snapshot unreadable, starting empty");
            Snapshot::default()
        }
    }
}

impl LocalProcessWorkload {
    /// Create a controller rooted at the given directory. Pushed file
    /// paths are resolved relative to it, and the plan snapshot left by
    /// a previous invocation is reloaded from it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let snapshot = load_snapshot(&root.join(SNAPSHOT_PATH));
        let adopted: BTreeMap<String, u32> = snapshot
            .pids
            .into_iter()
            .filter(|(_, pid)| pid_alive(*pid))
            .collect();
        Self {
            root,
            inner: Mutex::new(Inner {
                services: snapshot.services,
                children: HashMap::new(),
                adopted,
            }),
        }
    }

    /// The filesystem root services run under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn command_for(spec: &ServiceSpec) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&spec.command).envs(&spec.environment);
        cmd
    }

    async fn spawn(&self, service: &str, spec: &ServiceSpec) -> Result<Child> {
        Self::command_for(spec)
            .spawn()
            .map_err(|e| Error::spawn_failed(service, e.to_string()))
    }

    /// Write the current plan and live PIDs back to the snapshot file.
    async fn persist(&self, inner: &Inner) -> Result<()> {
        let mut pids = inner.adopted.clone();
        for (name, child) in &inner.children {
            if let Some(pid) = child.id() {
                pids.insert(name.clone(), pid);
            }
        }
        let snapshot = Snapshot {
            services: inner.services.clone(),
            pids,
        };

        let target = self.root.join(SNAPSHOT_PATH);
        let path = target.display().to_string();
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::persist_failed(&path, e.to_string()))?;
        }
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| Error::persist_failed(&path, e.to_string()))?;

        // Write-then-rename so a crash never leaves a torn snapshot.
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::persist_failed(&path, e.to_string()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| Error::persist_failed(&path, e.to_string()))?;
        Ok(())
    }

    /// Whether the service still runs, reaping finished children and
    /// dropping dead adopted PIDs along the way.
    fn service_alive(service: &str, inner: &mut Inner) -> bool {
        if let Some(child) = inner.children.get_mut(service) {
            return match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    debug!(service, %status, "service exited");
                    inner.children.remove(service);
                    false
                }
                Err(e) => {
                    warn!(service, error = %e, "failed to poll service, assuming dead");
                    inner.children.remove(service);
                    false
                }
            };
        }
        match inner.adopted.get(service) {
            Some(&pid) if pid_alive(pid) => true,
            Some(_) => {
                inner.adopted.remove(service);
                false
            }
            None => false,
        }
    }

    async fn terminate(service: &str, pid: u32) -> Result<()> {
        let status = Command::new("kill")
            .arg(pid.to_string())
            .status()
            .await
            .map_err(|e| Error::stop_failed(service, e.to_string()))?;
        // A failed kill is fine if the process is already gone.
        if status.success() || !pid_alive(pid) {
            Ok(())
        } else {
            Err(Error::stop_failed(
                service,
                format!("kill exited with {status}"),
            ))
        }
    }
}

#[async_trait]
impl WorkloadController for LocalProcessWorkload {
    async fn push_file(&self, path: &str, contents: &str, mode: u32) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::push_failed(path, e.to_string()))?;
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|e| Error::push_failed(path, e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| Error::push_failed(path, e.to_string()))?;
        }

        debug!(path, mode = %format!("{mode:o}"), "pushed file");
        Ok(())
    }

    async fn apply_layer(&self, layer: &ServiceLayer, combine: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !combine {
            inner.services.clear();
        }
        for (name, spec) in &layer.services {
            inner.services.insert(name.clone(), spec.clone());
        }
        self.persist(&inner).await?;
        debug!(services = inner.services.len(), combine, "layer applied");
        Ok(())
    }

    async fn is_running(&self, service: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(Self::service_alive(service, &mut inner))
    }

    async fn start(&self, service: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let spec = inner
            .services
            .get(service)
            .cloned()
            .ok_or_else(|| Error::service_not_found(service))?;

        if Self::service_alive(service, &mut inner) {
            debug!(service, "already running");
            return Ok(());
        }

        let child = self.spawn(service, &spec).await?;
        inner.children.insert(service.to_string(), child);
        self.persist(&inner).await?;
        info!(service, "started");
        Ok(())
    }

    async fn stop(&self, service: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.services.contains_key(service) {
            return Err(Error::service_not_found(service));
        }
        if let Some(mut child) = inner.children.remove(service) {
            child
                .kill()
                .await
                .map_err(|e| Error::stop_failed(service, e.to_string()))?;
            info!(service, "stopped");
        } else if let Some(pid) = inner.adopted.remove(service) {
            Self::terminate(service, pid).await?;
            info!(service, pid, "stopped");
        }
        self.persist(&inner).await?;
        Ok(())
    }

    async fn run_to_completion(&self, service: &str) -> Result<()> {
        let spec = {
            let inner = self.inner.lock().await;
            inner
                .services
                .get(service)
                .cloned()
                .ok_or_else(|| Error::service_not_found(service))?
        };

        // The lock is released while the one-shot run blocks; the
        // operator is single-pass, so nothing else mutates the plan.
        let mut child = self.spawn(service, &spec).await?;
        let status = child
            .wait()
            .await
            .map_err(|e| Error::one_shot_failed(service, e.to_string()))?;

        if status.success() {
            info!(service, "one-shot run finished");
            Ok(())
        } else {
            Err(Error::one_shot_failed(service, status.to_string()))
        }
    }

    async fn autostart(&self) -> Result<()> {
        let enabled: Vec<String> = {
            let inner = self.inner.lock().await;
            inner
                .services
                .iter()
                .filter(|(_, spec)| spec.autostarts())
                .map(|(name, _)| name.clone())
                .collect()
        };
        for name in enabled {
            self.start(&name).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn oneshot_layer(name: &str, command: &str) -> ServiceLayer {
        ServiceLayer::new("test", "test layer")
            .with_service(name, ServiceSpec::new(name, command))
    }

    #[tokio::test]
    async fn test_push_file_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let workload = LocalProcessWorkload::new(dir.path());

        workload
            .push_file("/charm/bin/script.sh", "#!/bin/sh\n", 0o755)
            .await
            .unwrap();

        let target = dir.path().join("charm/bin/script.sh");
        let contents = std::fs::read_to_string(&target).unwrap();
        assert_eq!(contents, "#!/bin/sh\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_run_to_completion_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let workload = LocalProcessWorkload::new(dir.path());

        workload
            .apply_layer(&oneshot_layer("ok", "true"), true)
            .await
            .unwrap();
        workload.run_to_completion("ok").await.unwrap();

        workload
            .apply_layer(&oneshot_layer("bad", "exit 3"), true)
            .await
            .unwrap();
        assert!(matches!(
            workload.run_to_completion("bad").await,
            Err(Error::OneShotFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_stop_long_running_service() {
        let dir = tempfile::tempdir().unwrap();
        let workload = LocalProcessWorkload::new(dir.path());

        workload
            .apply_layer(&oneshot_layer("sleeper", "sleep 30"), true)
            .await
            .unwrap();
        workload.start("sleeper").await.unwrap();
        assert!(workload.is_running("sleeper").await.unwrap());

        // Starting again is a no-op while the child is alive.
        workload.start("sleeper").await.unwrap();

        workload.stop("sleeper").await.unwrap();
        assert!(!workload.is_running("sleeper").await.unwrap());
    }

    #[tokio::test]
    async fn test_exited_service_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let workload = LocalProcessWorkload::new(dir.path());

        workload
            .apply_layer(&oneshot_layer("quick", "true"), true)
            .await
            .unwrap();
        workload.start("quick").await.unwrap();

        // Give the child a moment to exit.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!workload.is_running("quick").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_service_errors() {
        let dir = tempfile::tempdir().unwrap();
        let workload = LocalProcessWorkload::new(dir.path());
        assert!(workload.start("ghost").await.is_err());
        assert!(workload.stop("ghost").await.is_err());
        assert!(workload.run_to_completion("ghost").await.is_err());
        assert!(!workload.is_running("ghost").await.unwrap());
    }

    // One controller per event invocation: the plan and running
    // services must carry over through the snapshot on disk.
    #[tokio::test]
    async fn test_plan_survives_across_invocations() {
        let dir = tempfile::tempdir().unwrap();

        {
            let first = LocalProcessWorkload::new(dir.path());
            first
                .apply_layer(&oneshot_layer("sleeper", "sleep 30"), true)
                .await
                .unwrap();
            first.start("sleeper").await.unwrap();
            assert!(first.is_running("sleeper").await.unwrap());
        }

        // A fresh controller over the same root sees the same plan and
        // the still-running service.
        let second = LocalProcessWorkload::new(dir.path());
        assert!(second.is_running("sleeper").await.unwrap());

        // Start is a no-op while the adopted service is alive.
        second.start("sleeper").await.unwrap();

        second.stop("sleeper").await.unwrap();
        assert!(!second.is_running("sleeper").await.unwrap());

        // The plan itself survives too: the service can be restarted.
        second.start("sleeper").await.unwrap();
        second.stop("sleeper").await.unwrap();
    }

    #[tokio::test]
    async fn test_dead_adopted_service_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();

        {
            let first = LocalProcessWorkload::new(dir.path());
            first
                .apply_layer(&oneshot_layer("quick", "true"), true)
                .await
                .unwrap();
            first.start("quick").await.unwrap();
        }

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let second = LocalProcessWorkload::new(dir.path());
        assert!(!second.is_running("quick").await.unwrap());
        // Known from the plan, just not running; stop is a no-op.
        second.stop("quick").await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let workload = LocalProcessWorkload::new(dir.path());
        assert!(workload.start("anything").await.is_err());
    }
}

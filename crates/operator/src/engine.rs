//! Reconciliation engine.
//!
//! The whole state machine is derived from two persistent flags: the
//! `installed` latch and the presence of a primary connection string.
//! [`plan`] maps the pair to one of four actions; [`Reconciler`]
//! executes the chosen action against the workload supervisor. Every
//! invocation is a complete, idempotent re-evaluation.

use std::sync::Arc;

use drupal_state::{PersistentState, StateStore};
use drupal_workload::WorkloadController;
use tracing::{debug, error, info, warn};

use crate::config::OperatorConfig;
use crate::conninfo;
use crate::error::{Error, Result};
use crate::layer::{
    install_layer, push_install_artifacts, DRUPAL_SERVICE, INSTALL_DRUPAL_SERVICE,
};
use crate::status::{
    Status, StatusReporter, INSTALLING, INSTALL_ALREADY_RUNNING, WAITING_FOR_DATABASE,
};

/// Action chosen for one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Installed with a database: keep the main service running.
    EnsureRunning,
    /// Installed but the database went away: keep the service stopped.
    EnsureStopped,
    /// Database present but not yet installed: run the installation.
    Install,
    /// Nothing to do until a database relation appears.
    WaitForDatabase,
}

/// Pure decision function over the two persistent flags.
pub fn plan(installed: bool, has_connection: bool) -> Plan {
    match (installed, has_connection) {
        (true, true) => Plan::EnsureRunning,
        (true, false) => Plan::EnsureStopped,
        (false, true) => Plan::Install,
        (false, false) => Plan::WaitForDatabase,
    }
}

/// Executes reconciliation passes against the workload supervisor.
pub struct Reconciler {
    store: Arc<dyn StateStore>,
    workload: Arc<dyn WorkloadController>,
    reporter: Arc<dyn StatusReporter>,
    config: OperatorConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        store: Arc<dyn StateStore>,
        workload: Arc<dyn WorkloadController>,
        reporter: Arc<dyn StatusReporter>,
        config: OperatorConfig,
    ) -> Self {
        Self {
            store,
            workload,
            reporter,
            config,
        }
    }

    /// Run one full reconciliation pass and return the resulting status.
    ///
    /// Supervisor failures propagate as errors; the previously reported
    /// status then stays in place until the orchestrator redelivers the
    /// triggering event.
    pub async fn reconcile(&self) -> Result<Status> {
        let mut state = self
            .store
            .load()
            .await?
            .ok_or(Error::StateUninitialized)?;

        let chosen = plan(state.installed, state.has_connection());
        debug!(
            installed = state.installed,
            has_connection = state.has_connection(),
            plan = ?chosen,
            "reconciling"
        );

        let status = match chosen {
            Plan::EnsureRunning => self.ensure_running().await?,
            Plan::EnsureStopped => self.ensure_stopped().await?,
            Plan::Install => self.install(&mut state).await?,
            Plan::WaitForDatabase => {
                info!("not installed and no database, waiting for the relation");
                Status::Blocked(WAITING_FOR_DATABASE.to_string())
            }
        };

        self.reporter.report(&status);
        Ok(status)
    }

    async fn ensure_running(&self) -> Result<Status> {
        push_install_artifacts(self.workload.as_ref()).await?;

        if !self.workload.is_running(DRUPAL_SERVICE).await? {
            info!(service = DRUPAL_SERVICE, "service not running, starting");
            self.workload.start(DRUPAL_SERVICE).await?;
        }
        Ok(Status::Active)
    }

    async fn ensure_stopped(&self) -> Result<Status> {
        info!("installed but the database is gone, stopping the service");
        if self.workload.is_running(DRUPAL_SERVICE).await? {
            self.workload.stop(DRUPAL_SERVICE).await?;
        }
        Ok(Status::Blocked(WAITING_FOR_DATABASE.to_string()))
    }

    async fn install(&self, state: &mut PersistentState) -> Result<Status> {
        // plan() only selects Install when a connection string is present.
        let Some(conn_str) = state.db_conn_str.as_deref() else {
            return Ok(Status::Blocked(WAITING_FOR_DATABASE.to_string()));
        };

        let db = match conninfo::parse(conn_str) {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "database connection string rejected");
                return Ok(Status::Blocked(format!(
                    "Invalid database connection string: {e}"
                )));
            }
        };

        let layer = install_layer(&self.config, &state.admin_password, &db);
        self.workload.apply_layer(&layer, true).await?;

        if self.workload.is_running(INSTALL_DRUPAL_SERVICE).await? {
            // The one-shot service was just (re)defined and must not be
            // running. No automatic recovery: operator intervention
            // required.
            error!(
                service = INSTALL_DRUPAL_SERVICE,
                "install service unexpectedly running"
            );
            return Ok(Status::Blocked(INSTALL_ALREADY_RUNNING.to_string()));
        }

        info!("database ready, starting Drupal installation");
        self.reporter
            .report(&Status::Maintenance(INSTALLING.to_string()));
        self.workload
            .run_to_completion(INSTALL_DRUPAL_SERVICE)
            .await?;

        state.mark_installed();
        self.store.save(state).await?;

        self.workload.start(DRUPAL_SERVICE).await?;
        info!("installation finished, service started");
        Ok(Status::Active)
    }
}

//! Event dispatch: one entry point per orchestrator-delivered event.
//!
//! Relation handlers that mutate connection state re-enter the
//! reconciliation engine with a direct call, not a re-queued event, so
//! each delivered event is processed in exactly one pass.

use std::sync::Arc;

use drupal_state::{generate_password, PersistentState, StateStore, GENERATED_PASSWORD_LEN};
use drupal_workload::WorkloadController;
use tracing::{debug, info};

use crate::config::OperatorConfig;
use crate::engine::Reconciler;
use crate::error::{Error, Result};
use crate::layer::{base_layer, push_install_artifacts};
use crate::relation::{is_expected_database, join_outcome, JoinOutcome, PrimaryConnection};
use crate::status::{Status, StatusReporter};

/// Events the orchestrator delivers to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The workload container is up and the supervisor is reachable.
    WorkloadReady,
    /// User configuration changed, or a relation handler requested a
    /// reconciliation pass.
    ConfigChanged,
    /// The database relation was joined.
    RelationJoined {
        is_leader: bool,
        requested_database: Option<String>,
    },
    /// The primary connection changed (or disappeared).
    PrimaryChanged {
        database: String,
        primary: Option<PrimaryConnection>,
    },
    /// The set of read-only replicas changed.
    ReplicaChanged {
        database: String,
        standby_uris: Vec<String>,
    },
    /// The database relation went away.
    RelationBroken,
}

/// What handling an event produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A reconciliation pass ran; this is the resulting status.
    Status(Status),
    /// The leader declared database requirements to the relation.
    Declared(crate::relation::DatabaseRequest),
    /// The event must be redelivered later.
    Deferred,
    /// The event was ignored (database-name guard).
    Ignored,
    /// The event was handled without a reconciliation pass.
    Handled,
}

/// The operator: owns configuration and the seams to the state store
/// and the workload supervisor.
pub struct Operator {
    config: OperatorConfig,
    store: Arc<dyn StateStore>,
    workload: Arc<dyn WorkloadController>,
    reconciler: Reconciler,
}

impl Operator {
    /// Create the operator, initializing persistent state on first run.
    ///
    /// The admin password is fixed here: a configured `account-password`
    /// wins, otherwise a password is generated once and stored.
    pub async fn new(
        config: OperatorConfig,
        store: Arc<dyn StateStore>,
        workload: Arc<dyn WorkloadController>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Result<Self> {
        if store.load().await?.is_none() {
            let password = config
                .account_password
                .clone()
                .unwrap_or_else(|| generate_password(GENERATED_PASSWORD_LEN));
            store.save(&PersistentState::new(password)).await?;
            info!("initialized persistent state");
        }

        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&workload),
            reporter,
            config.clone(),
        );

        Ok(Self {
            config,
            store,
            workload,
            reconciler,
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Handle one orchestrator event to completion.
    pub async fn handle(&self, event: Event) -> Result<Outcome> {
        debug!(event = ?event, "handling event");
        match event {
            Event::WorkloadReady => self.on_workload_ready().await,
            Event::ConfigChanged => {
                let status = self.reconciler.reconcile().await?;
                Ok(Outcome::Status(status))
            }
            Event::RelationJoined {
                is_leader,
                requested_database,
            } => Ok(self.on_relation_joined(is_leader, requested_database.as_deref())),
            Event::PrimaryChanged { database, primary } => {
                self.on_primary_changed(&database, primary).await
            }
            Event::ReplicaChanged {
                database,
                standby_uris,
            } => self.on_replica_changed(&database, standby_uris).await,
            Event::RelationBroken => self.on_relation_broken().await,
        }
    }

    /// The `get-admin-password` action: the stored password, verbatim.
    /// No side effects; valid in every state.
    pub async fn admin_password(&self) -> Result<String> {
        let state = self.load_state().await?;
        Ok(state.admin_password)
    }

    async fn load_state(&self) -> Result<PersistentState> {
        self.store.load().await?.ok_or(Error::StateUninitialized)
    }

    /// Push installer scripts, apply the initial layer and autostart.
    async fn on_workload_ready(&self) -> Result<Outcome> {
        push_install_artifacts(self.workload.as_ref()).await?;
        self.workload.apply_layer(&base_layer(), true).await?;
        self.workload.autostart().await?;
        info!("workload initialized");
        Ok(Outcome::Handled)
    }

    fn on_relation_joined(
        &self,
        is_leader: bool,
        requested_database: Option<&str>,
    ) -> Outcome {
        match join_outcome(is_leader, requested_database) {
            JoinOutcome::Declare(request) => {
                info!(database = %request.database, "declaring database requirements");
                Outcome::Declared(request)
            }
            JoinOutcome::Defer => {
                debug!("negotiation incomplete, deferring");
                Outcome::Deferred
            }
            JoinOutcome::Accept => Outcome::Handled,
        }
    }

    async fn on_primary_changed(
        &self,
        database: &str,
        primary: Option<PrimaryConnection>,
    ) -> Result<Outcome> {
        if !is_expected_database(database) {
            debug!(database, "primary-changed for an unexpected database, ignoring");
            return Ok(Outcome::Ignored);
        }

        let mut state = self.load_state().await?;
        state.set_primary(primary.map(|p| (p.conn_str, p.uri)));
        debug!(db_uri = ?state.db_uri, "primary connection updated");
        self.store.save(&state).await?;

        let status = self.reconciler.reconcile().await?;
        Ok(Outcome::Status(status))
    }

    async fn on_replica_changed(
        &self,
        database: &str,
        standby_uris: Vec<String>,
    ) -> Result<Outcome> {
        if !is_expected_database(database) {
            debug!(database, "replica-changed for an unexpected database, ignoring");
            return Ok(Outcome::Ignored);
        }

        let mut state = self.load_state().await?;
        state.set_replicas(standby_uris);
        self.store.save(&state).await?;
        Ok(Outcome::Handled)
    }

    async fn on_relation_broken(&self) -> Result<Outcome> {
        let mut state = self.load_state().await?;
        state.clear_connection();
        self.store.save(&state).await?;
        info!("database relation broken, connection state cleared");

        let status = self.reconciler.reconcile().await?;
        Ok(Outcome::Status(status))
    }
}

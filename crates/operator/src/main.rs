//! Hook-style CLI entry point.
//!
//! The orchestrator dispatches each lifecycle event as one process
//! invocation; persistent state lives on disk between invocations. One
//! subcommand per event, plus the `get-admin-password` action.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drupal_operator::{Event, LogReporter, Operator, OperatorConfig, Outcome, PrimaryConnection};
use drupal_state::FileStateStore;
use drupal_workload::LocalProcessWorkload;

/// Drupal workload operator
#[derive(Parser, Debug)]
#[command(name = "drupal-operator")]
#[command(version)]
#[command(about = "Lifecycle operator for a containerized Drupal workload")]
struct Cli {
    /// Path to the operator config file (TOML)
    #[arg(long, default_value = "/etc/drupal-operator/config.toml")]
    config: PathBuf,

    /// Path to the persistent state file
    #[arg(long, default_value = "/var/lib/drupal-operator/state.json")]
    state: PathBuf,

    /// Root directory the workload supervisor runs services under
    #[arg(long, default_value = "/")]
    workload_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// The workload container is up and the supervisor is reachable
    WorkloadReady,

    /// User configuration changed; run a reconciliation pass
    ConfigChanged,

    /// The database relation was joined
    DbRelationJoined {
        /// Whether this unit is the elected leader
        #[arg(long)]
        leader: bool,

        /// Database name already requested on the relation, if any
        #[arg(long)]
        database: Option<String>,
    },

    /// The primary database connection changed
    DbPrimaryChanged {
        /// Database name the event refers to
        #[arg(long)]
        database: String,

        /// Primary connection string (libpq keyword/value form)
        #[arg(long)]
        conn_str: Option<String>,

        /// Primary connection URI
        #[arg(long)]
        uri: Option<String>,
    },

    /// The set of read-only replicas changed
    DbReplicaChanged {
        /// Database name the event refers to
        #[arg(long)]
        database: String,

        /// Replica connection URIs, in delivery order
        #[arg(long = "standby")]
        standbys: Vec<String>,
    },

    /// The database relation went away
    DbRelationBroken,

    /// Print the admin account password
    GetAdminPassword,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn event_for(command: Commands) -> Result<Option<Event>> {
    let event = match command {
        Commands::WorkloadReady => Event::WorkloadReady,
        Commands::ConfigChanged => Event::ConfigChanged,
        Commands::DbRelationJoined { leader, database } => Event::RelationJoined {
            is_leader: leader,
            requested_database: database,
        },
        Commands::DbPrimaryChanged {
            database,
            conn_str,
            uri,
        } => {
            let primary = match (conn_str, uri) {
                (Some(conn_str), Some(uri)) => Some(PrimaryConnection { conn_str, uri }),
                (None, None) => None,
                _ => bail!("--conn-str and --uri must be given together"),
            };
            Event::PrimaryChanged {
                database,
                primary,
            }
        }
        Commands::DbReplicaChanged { database, standbys } => Event::ReplicaChanged {
            database,
            standby_uris: standbys,
        },
        Commands::DbRelationBroken => Event::RelationBroken,
        Commands::GetAdminPassword => return Ok(None),
    };
    Ok(Some(event))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = OperatorConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let store = Arc::new(FileStateStore::new(&cli.state));
    let workload = Arc::new(LocalProcessWorkload::new(&cli.workload_root));
    let operator = Operator::new(config, store, workload, Arc::new(LogReporter))
        .await
        .context("initializing operator")?;

    match event_for(cli.command)? {
        None => {
            // get-admin-password action
            let password = operator.admin_password().await?;
            println!("{}", serde_json::json!({ "password": password }));
        }
        Some(event) => match operator.handle(event).await? {
            Outcome::Status(status) => println!("{status}"),
            Outcome::Declared(request) => {
                println!("declared database '{}'", request.database);
            }
            Outcome::Deferred => println!("deferred"),
            Outcome::Ignored => println!("ignored"),
            Outcome::Handled => println!("ok"),
        },
    }

    Ok(())
}

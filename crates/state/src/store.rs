//! State store trait and implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::state::PersistentState;

/// Trait for persistent state backends.
///
/// The operator is single-writer: exactly one pass mutates state at a
/// time, so implementations only need durability, not coordination.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stored state. `None` means the store has never been
    /// written (fresh deployment).
    async fn load(&self) -> Result<Option<PersistentState>>;

    /// Persist the state record.
    async fn save(&self, state: &PersistentState) -> Result<()>;
}

/// In-memory state store for testing.
#[derive(Default)]
pub struct InMemoryStateStore {
    inner: RwLock<Option<PersistentState>>,
}

impl InMemoryStateStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a state record.
    pub fn with_state(state: PersistentState) -> Self {
        Self {
            inner: RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<Option<PersistentState>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &PersistentState) -> Result<()> {
        *self.inner.write().await = Some(state.clone());
        Ok(())
    }
}

/// File-backed state store with crash-consistent writes.
///
/// The record is serialized to JSON, written to a sibling temp file and
/// moved into place with an atomic rename, so a crash mid-write never
/// leaves a truncated record behind.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<PersistentState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file yet");
                return Ok(None);
            }
            Err(e) => return Err(Error::read_failed(&self.path, e.to_string())),
        };

        let state = serde_json::from_slice(&bytes)
            .map_err(|e| Error::decode_failed(e.to_string()))?;
        Ok(Some(state))
    }

    async fn save(&self, state: &PersistentState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| Error::decode_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::write_failed(parent, e.to_string()))?;
            }
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::write_failed(&tmp, e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::write_failed(&self.path, e.to_string()))?;

        debug!(path = %self.path.display(), "state persisted");
        Ok(())
    }
}

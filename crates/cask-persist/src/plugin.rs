//! The persistence plugin

use crate::error::{Error, Result};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use async_trait::async_trait;
use cask_core::{Plugin, State, Store};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Storage key used when none is configured
pub const DEFAULT_KEY: &str = "cask";

/// What `on_ready` did with the initial state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// A stored snapshot was written into the store
    Restored,
    /// Nothing usable was stored; the initial state was persisted
    Initialized,
    /// Storage already held exactly the initial state
    Unchanged,
}

/// Where persisted state lives
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageBackend {
    #[default]
    Memory,
    File {
        dir: PathBuf,
    },
    /// Persistence switched off, for environments without storage
    Disabled,
}

/// Serializable persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    pub key: String,
    pub backend: StorageBackend,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            backend: StorageBackend::default(),
        }
    }
}

impl PersistConfig {
    /// Parse settings from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|err| Error::Core(err.into()))
    }

    /// Load settings from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&content)
    }
}

/// Mirrors a store's state to a [`Storage`] under a single key.
///
/// On ready, a stored snapshot that differs from the initial state is
/// written into the store; with nothing usable stored, the initial state is
/// persisted instead. Every save that differs from what is stored is merged
/// onto the store's current state and persisted.
pub struct PersistedState {
    key: String,
    storage: Option<Arc<dyn Storage>>,
    last_outcome: Mutex<Option<ReadyOutcome>>,
}

impl PersistedState {
    /// Persist to `storage` under [`DEFAULT_KEY`]
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            storage: Some(Arc::new(storage)),
            last_outcome: Mutex::new(None),
        }
    }

    /// A plugin that skips every operation
    pub fn disabled() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            storage: None,
            last_outcome: Mutex::new(None),
        }
    }

    pub fn from_config(config: PersistConfig) -> Self {
        let plugin = match config.backend {
            StorageBackend::Memory => Self::new(MemoryStorage::new()),
            StorageBackend::File { dir } => Self::new(FileStorage::new(dir)),
            StorageBackend::Disabled => Self::disabled(),
        };
        plugin.with_key(config.key)
    }

    /// Use a different storage key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Outcome of the most recent `on_ready`
    pub fn last_outcome(&self) -> Option<ReadyOutcome> {
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored snapshot. Missing, unreadable or malformed data is `None`.
    pub async fn retrieve(&self) -> Option<State> {
        let storage = self.storage.as_ref()?;

        let text = match storage.get_item(&self.key).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                debug!(key = %self.key, error = %format!("{err:#}"), "stored state unreadable");
                return None;
            }
        };

        match State::from_json(&text) {
            Ok(state) => Some(state),
            Err(err) => {
                debug!(key = %self.key, error = %err, "stored state malformed, ignoring");
                None
            }
        }
    }

    /// Persist the store's whole current state
    pub async fn refresh(&self, store: &Store) -> Result<()> {
        self.save(&store.state()).await
    }

    async fn save(&self, state: &State) -> Result<()> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };
        let text = state.to_canonical_json()?;
        storage.set_item(&self.key, &text).await?;
        debug!(key = %self.key, bytes = text.len(), "state persisted");
        Ok(())
    }

    /// Whether storage holds exactly `state`
    async fn is_stored(&self, storage: &dyn Storage, state: &State) -> Result<bool> {
        let text = state.to_canonical_json()?;
        let stored = storage.get_item(&self.key).await?;
        Ok(stored.as_deref() == Some(text.as_str()))
    }

    fn record(&self, outcome: ReadyOutcome) {
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    }
}

#[async_trait]
impl Plugin for PersistedState {
    fn name(&self) -> &str {
        "persisted_state"
    }

    async fn on_ready(&self, store: &Store, state: &State) -> anyhow::Result<()> {
        let Some(storage) = self.storage.as_deref() else {
            return Ok(());
        };

        let stored = match self.is_stored(storage, state).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(key = %self.key, error = %err, "storage unavailable, state not restored");
                return Ok(());
            }
        };

        let outcome = if stored {
            ReadyOutcome::Unchanged
        } else if let Some(cached) = self.retrieve().await {
            store.set(cached).await?;
            ReadyOutcome::Restored
        } else {
            if let Err(err) = self.save(state).await {
                warn!(key = %self.key, error = %err, "initial state not persisted");
                return Ok(());
            }
            ReadyOutcome::Initialized
        };

        self.record(outcome);
        info!(key = %self.key, ?outcome, "persisted state ready");
        Ok(())
    }

    async fn on_save(&self, store: &Store, state: &State) -> anyhow::Result<()> {
        let Some(storage) = self.storage.as_deref() else {
            return Ok(());
        };

        let written = match self.is_stored(storage, state).await {
            Ok(true) => Ok(()),
            Ok(false) => self.save(&store.state().merged(state)).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            warn!(key = %self.key, error = %err, "state not persisted");
        }
        Ok(())
    }
}

impl std::fmt::Debug for PersistedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedState")
            .field("key", &self.key)
            .field("enabled", &self.is_enabled())
            .field("last_outcome", &self.last_outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_ron() {
        let config = PersistConfig::from_ron_str(
            r#"(key: "app", backend: File(dir: "/var/lib/app"))"#,
        )
        .unwrap();
        assert_eq!(config.key, "app");
        assert_eq!(
            config.backend,
            StorageBackend::File {
                dir: PathBuf::from("/var/lib/app")
            }
        );

        let defaults = PersistConfig::from_ron_str("()").unwrap();
        assert_eq!(defaults, PersistConfig::default());
    }

    #[test]
    fn test_malformed_config() {
        let err = PersistConfig::from_ron_str("(backend: Floppy)").unwrap_err();
        assert!(matches!(err, Error::Core(cask_core::Error::Config(_))));
    }

    #[test]
    fn test_from_config_backends() {
        let memory = PersistedState::from_config(PersistConfig::default());
        assert!(memory.is_enabled());
        assert_eq!(memory.key(), DEFAULT_KEY);

        let off = PersistedState::from_config(PersistConfig {
            key: "x".into(),
            backend: StorageBackend::Disabled,
        });
        assert!(!off.is_enabled());
        assert_eq!(off.key(), "x");
    }

    #[tokio::test]
    async fn test_retrieve_tolerates_garbage() {
        let plugin = PersistedState::new(MemoryStorage::new().with_item(DEFAULT_KEY, "{not json"));
        assert_eq!(plugin.retrieve().await, None);

        let plugin = PersistedState::new(MemoryStorage::new().with_item(DEFAULT_KEY, "[1,2]"));
        assert_eq!(plugin.retrieve().await, None);
    }
}

//! Cask Persist - Mirrors a cask store to key/value storage
//!
//! [`PersistedState`] is a [`cask_core::Plugin`] that restores a stored
//! snapshot when the store becomes ready and persists every save as one
//! canonical JSON document. Storage is abstracted by the [`Storage`] trait,
//! with in-memory and file-backed implementations.

mod error;
mod plugin;
mod storage;

pub use error::{Error, Result};
pub use plugin::{PersistConfig, PersistedState, ReadyOutcome, StorageBackend, DEFAULT_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage};

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::{file_storage::FileStorage, memory_storage::MemoryStorage};
use crate::config::StorageConfig;

/// Raw persisted entries, keyed by the persisted field name.
pub type Entries = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("cookie jar could not be read or written: {0}")]
    Cookies(String),
}

/// The StorageBackend trait abstracts where session entries are kept between runs.
///
/// The session store keeps the authoritative copy in memory and hands the
/// complete set of entries to `persist` after every mutation.
pub trait StorageBackend: Send + Sync {
    fn load(&self) -> Result<Entries, StorageError>;
    fn persist(&self, entries: &Entries) -> Result<(), StorageError>;
    fn is_durable(&self) -> bool {
        // Only the in-memory backend returns false so we can log what we are running with
        true
    }
}

/// Creates a concrete storage backend based on the StorageConfig.
pub fn create_storage(config: &StorageConfig) -> Arc<dyn StorageBackend> {
    match config {
        StorageConfig::Memory => {
            info!("Session storage is in-memory; the session ends with the process.");
            Arc::new(MemoryStorage::new())
        }
        StorageConfig::File(file_config) => {
            info!("Session storage is file-backed at '{}'", file_config.path);
            Arc::new(FileStorage::new(&file_config.path))
        }
    }
}

use super::backend::{Entries, StorageBackend, StorageError};

/// A storage backend that keeps nothing: entries live only in the session store itself.
pub struct MemoryStorage;

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> Result<Entries, StorageError> {
        Ok(Entries::new())
    }

    fn persist(&self, _entries: &Entries) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

//! Process-wide session state: the access token and the identity fields that go with it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::backend::{Entries, StorageBackend, StorageError};

/// The persisted session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    AccessToken,
    Email,
    FullName,
}

impl SessionField {
    pub const ALL: [SessionField; 3] = [
        SessionField::AccessToken,
        SessionField::Email,
        SessionField::FullName,
    ];

    /// The key the field is persisted under.
    pub fn key(self) -> &'static str {
        match self {
            SessionField::AccessToken => "accessToken",
            SessionField::Email => "email",
            SessionField::FullName => "fullName",
        }
    }
}

/// A point-in-time copy of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl Session {
    /// Only a non-empty access token makes a session authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Shared handle to the session entries.
///
/// Clones share the same state; every mutation is visible to all of them at once
/// and is written through to the storage backend. Last write wins.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<Entries>>,
    backend: Arc<dyn StorageBackend>,
}

impl SessionStore {
    /// Opens the store, reading whatever the backend already holds.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, StorageError> {
        let entries = backend.load()?;
        debug!(
            "Opened session store with {} entries (durable={})",
            entries.len(),
            backend.is_durable()
        );
        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            backend,
        })
    }

    pub fn get(&self, field: SessionField) -> Option<String> {
        self.read().get(field.key()).cloned()
    }

    pub fn set(&self, field: SessionField, value: impl Into<String>) {
        self.write([(field, Some(value.into()))]);
    }

    pub fn clear(&self, field: SessionField) {
        self.write([(field, None)]);
    }

    pub fn clear_all(&self, fields: &[SessionField]) {
        self.write(fields.iter().map(|field| (*field, None)));
    }

    /// Applies several field updates as one logical write; `None` removes the field.
    pub fn write<I>(&self, updates: I)
    where
        I: IntoIterator<Item = (SessionField, Option<String>)>,
    {
        let mut entries = self.write_lock();
        for (field, value) in updates {
            match value {
                Some(value) => {
                    entries.insert(field.key().to_string(), value);
                }
                None => {
                    entries.remove(field.key());
                }
            }
        }
        if let Err(e) = self.backend.persist(&entries) {
            error!("Failed to persist session entries: {}", e);
        }
    }

    pub fn snapshot(&self) -> Session {
        let entries = self.read();
        let field = |f: SessionField| entries.get(f.key()).cloned();
        Session {
            access_token: field(SessionField::AccessToken),
            email: field(SessionField::Email),
            full_name: field(SessionField::FullName),
        }
    }

    /// The non-empty access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.get(SessionField::AccessToken).filter(|t| !t.is_empty())
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.has_access_token())
            .field("durable", &self.backend.is_durable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::file_storage::FileStorage;
    use crate::session::memory_storage::MemoryStorage;

    fn memory_store() -> SessionStore {
        SessionStore::open(Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_set_get_clear() {
        let store = memory_store();
        assert_eq!(store.get(SessionField::AccessToken), None);

        store.set(SessionField::AccessToken, "abc");
        assert_eq!(store.get(SessionField::AccessToken).as_deref(), Some("abc"));

        store.clear(SessionField::AccessToken);
        assert_eq!(store.get(SessionField::AccessToken), None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = memory_store();
        let other = store.clone();
        store.set(SessionField::Email, "user@example.com");
        assert_eq!(
            other.get(SessionField::Email).as_deref(),
            Some("user@example.com")
        );
    }

    #[test]
    fn test_clear_all_only_touches_given_fields() {
        let store = memory_store();
        store.write([
            (SessionField::AccessToken, Some("abc".to_string())),
            (SessionField::Email, Some("a@b.c".to_string())),
            (SessionField::FullName, Some("Ada".to_string())),
        ]);

        store.clear_all(&[SessionField::AccessToken, SessionField::Email]);

        let session = store.snapshot();
        assert_eq!(session.access_token, None);
        assert_eq!(session.email, None);
        assert_eq!(session.full_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_empty_token_is_unauthenticated() {
        let store = memory_store();
        store.set(SessionField::AccessToken, "");
        assert!(!store.has_access_token());
        assert!(!store.snapshot().is_authenticated());

        store.set(SessionField::AccessToken, "abc");
        assert!(store.has_access_token());
        assert!(store.snapshot().is_authenticated());
    }

    #[test]
    fn test_identity_without_token_is_unauthenticated() {
        let store = memory_store();
        store.set(SessionField::Email, "a@b.c");
        store.set(SessionField::FullName, "Ada");
        assert!(!store.snapshot().is_authenticated());
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::open(Arc::new(FileStorage::new(&path))).unwrap();
        store.write([
            (SessionField::AccessToken, Some("abc".to_string())),
            (SessionField::FullName, Some("Ada Lovelace".to_string())),
        ]);
        drop(store);

        let reopened = SessionStore::open(Arc::new(FileStorage::new(&path))).unwrap();
        let session = reopened.snapshot();
        assert_eq!(session.access_token.as_deref(), Some("abc"));
        assert_eq!(session.full_name.as_deref(), Some("Ada Lovelace"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["accessToken"], "abc");
        assert_eq!(raw["fullName"], "Ada Lovelace");
    }

    #[test]
    fn test_open_fails_on_corrupt_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(SessionStore::open(Arc::new(FileStorage::new(&path))).is_err());
    }
}

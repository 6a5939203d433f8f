//! Cookie jar for the ambient refresh credential.
//!
//! The refresh endpoint authenticates with a cookie set at login, so a session
//! that outlives the process needs its cookies to outlive it too.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use cookie_store::{CookieStore, RawCookie};
use reqwest::header::HeaderValue;
use tracing::{debug, warn};
use url::Url;

use super::backend::StorageError;
use crate::config::StorageConfig;

/// A `reqwest` cookie provider that can write itself through to a JSON file.
///
/// Session cookies are kept as well: every command of the shell is its own
/// process, and the server's session cookie would otherwise never survive to
/// the next one.
#[derive(Debug)]
pub struct CookieJar {
    store: RwLock<CookieStore>,
    path: Option<PathBuf>,
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self {
            store: RwLock::new(CookieStore::default()),
            path: None,
        }
    }

    /// Opens the jar stored at `path`; a missing file is an empty jar.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let store = match File::open(&path) {
            Ok(file) => cookie_store::serde::json::load_all(BufReader::new(file))
                .map_err(|e| StorageError::Cookies(e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cookie jar at '{}', starting empty", path.display());
                CookieStore::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            store: RwLock::new(store),
            path: Some(path),
        })
    }

    /// The jar that goes with a storage configuration: durable next to a
    /// session file, in memory otherwise.
    pub fn for_storage(config: &StorageConfig) -> Result<Self, StorageError> {
        match config {
            StorageConfig::Memory => Ok(Self::in_memory()),
            StorageConfig::File(file_config) => {
                Self::open(cookie_path(Path::new(&file_config.path)))
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn save(&self, store: &CookieStore) -> Result<(), StorageError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut serialized = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(store, &mut serialized)
            .map_err(|e| StorageError::Cookies(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| RawCookie::parse(value.to_string()).ok())
            .collect();
        if cookies.is_empty() {
            return;
        }

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.store_response_cookies(cookies.into_iter(), url);
        if let Err(e) = self.save(&store) {
            warn!("Failed to persist cookies: {}", e);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let header = store
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

/// `session.json` keeps its cookies in `session.cookies.json`.
fn cookie_path(session_path: &Path) -> PathBuf {
    session_path.with_extension("cookies.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore as _;

    fn set(jar: &CookieJar, header: &'static str, url: &Url) {
        let value = HeaderValue::from_static(header);
        jar.set_cookies(&mut std::iter::once(&value), url);
    }

    #[test]
    fn test_cookie_path_sits_next_to_session_file() {
        assert_eq!(
            cookie_path(Path::new("/var/lib/shell/session.json")),
            PathBuf::from("/var/lib/shell/session.cookies.json")
        );
    }

    #[test]
    fn test_in_memory_jar_round_trips_cookies() {
        let jar = CookieJar::in_memory();
        let url = Url::parse("http://127.0.0.1:8080/auth/login").unwrap();
        set(&jar, "refresh=r1; Path=/", &url);

        let sent = jar
            .cookies(&Url::parse("http://127.0.0.1:8080/auth/refresh").unwrap())
            .unwrap();
        assert_eq!(sent, "refresh=r1");
        assert!(jar.path().is_none());
    }

    #[test]
    fn test_session_cookie_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.cookies.json");
        let url = Url::parse("http://127.0.0.1:8080/auth/login").unwrap();

        let jar = CookieJar::open(&path).unwrap();
        assert!(jar.cookies(&url).is_none());
        set(&jar, "refresh=r1; Path=/; HttpOnly", &url);
        drop(jar);

        let reopened = CookieJar::open(&path).unwrap();
        assert_eq!(reopened.cookies(&url).unwrap(), "refresh=r1");
    }

    #[test]
    fn test_corrupt_jar_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.cookies.json");
        fs::write(&path, "{broken").unwrap();
        assert!(matches!(
            CookieJar::open(&path),
            Err(StorageError::Cookies(_))
        ));
    }
}

//! The hard-redirect seam.
//!
//! A hard redirect is a full navigation that throws away every piece of
//! in-memory state of the running shell. The front end decides what that means
//! for it; the client only asks for it.

use std::sync::{Mutex, PoisonError};

use tracing::warn;

pub trait Navigator: Send + Sync {
    fn hard_redirect(&self, location: &str);
}

/// Logs every redirect and remembers it, so the front end can act on the last one.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.redirects().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn hard_redirect(&self, location: &str) {
        warn!(
            event_name = "navigation.hard_redirect",
            event_domain = "navigation",
            location,
            "Forcing navigation"
        );
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location.to_string());
    }
}

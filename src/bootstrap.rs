//! Startup session resolution and the authenticated flag that drives route gating.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::session::SessionStore;
use crate::signal::SubscriptionId;

/// Where the shell stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Not resolved yet: render a placeholder, make no gating decision.
    Loading,
    Authenticated,
    Unauthenticated,
}

impl AuthStatus {
    fn from_session(session: &SessionStore) -> Self {
        if session.has_access_token() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }
}

/// Resolves the session once at startup, then follows auth-change signals.
///
/// Starts in `Loading`. [`start`](Self::start) moves it to `Authenticated` or
/// `Unauthenticated`; afterwards every signal re-derives the status from the
/// session store alone. It never goes back to `Loading`.
pub struct SessionBootstrap {
    client: ApiClient,
    status: Arc<watch::Sender<AuthStatus>>,
    subscription: SubscriptionId,
}

impl SessionBootstrap {
    /// Creates the bootstrap and subscribes it to the client's auth signal for its lifetime.
    pub fn new(client: ApiClient) -> Self {
        let (sender, _) = watch::channel(AuthStatus::Loading);
        let status = Arc::new(sender);

        let session = client.session().clone();
        let follower = status.clone();
        let subscription = client.signal().subscribe(move || {
            follower.send_if_modified(|current| {
                // The pending resolution reads the store itself.
                if *current == AuthStatus::Loading {
                    return false;
                }
                let next = AuthStatus::from_session(&session);
                if *current == next {
                    return false;
                }
                debug!("Auth status changed from {:?} to {:?}", *current, next);
                *current = next;
                true
            });
        });

        Self {
            client,
            status,
            subscription,
        }
    }

    /// Resolves the initial status.
    ///
    /// A stored token is trusted as-is; a stale one is found out by the next
    /// request that fails. Without a token a silent refresh is attempted, and its
    /// failure simply means there was no previous session.
    pub async fn start(&self) -> AuthStatus {
        if *self.status.borrow() != AuthStatus::Loading {
            return self.status();
        }

        let resolved = if self.client.session().has_access_token() {
            debug!("Found stored access token");
            AuthStatus::Authenticated
        } else {
            match self.client.silent_refresh().await {
                Ok(_) => {
                    info!("Restored session through silent refresh");
                    AuthStatus::from_session(self.client.session())
                }
                Err(e) => {
                    debug!("No valid session found: {}", e);
                    AuthStatus::Unauthenticated
                }
            }
        };

        self.status.send_replace(resolved);
        resolved
    }

    pub fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    /// A receiver that observes every status change.
    pub fn watch(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

impl Drop for SessionBootstrap {
    fn drop(&mut self) {
        self.client.signal().unsubscribe(self.subscription);
    }
}

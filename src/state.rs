//! Shared shell state.
//!
//! Everything a command needs: configuration, the session, the client and the
//! bootstrap that tracks whether the user is signed in.

use std::sync::Arc;

use crate::account::Account;
use crate::bootstrap::SessionBootstrap;
use crate::client::ApiClient;
use crate::config::ConfigV1;
use crate::navigation::Navigator;
use crate::session::SessionStore;
use crate::signal::AuthSignal;

/// Application state shared by every command.
///
/// The session, signal and navigator are the same instances the client holds.
#[derive(Clone)]
pub struct ShellState {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    pub session: SessionStore,
    pub signal: AuthSignal,
    pub navigator: Arc<dyn Navigator>,
    pub client: ApiClient,
    pub account: Account,
    /// Resolves and follows the authenticated status.
    pub bootstrap: Arc<SessionBootstrap>,
}

//! Shell startup.
//!
//! Builds the storage backend, session store, API client and bootstrap from the
//! configuration and resolves the initial authentication status.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::account::Account;
use crate::bootstrap::{AuthStatus, SessionBootstrap};
use crate::client::{ApiClient, ClientError};
use crate::config::ConfigV1;
use crate::navigation::Navigator;
use crate::session::{create_storage, CookieJar, SessionStore, StorageError};
use crate::signal::AuthSignal;
use crate::state::ShellState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not open session storage: {0}")]
    Storage(#[from] StorageError),
    #[error("could not create API client: {0}")]
    Client(#[from] ClientError),
}

/// Wires the shell together without touching the network.
///
/// # Errors
///
/// Returns an error if the persisted session or cookie jar cannot be read or the HTTP
/// client cannot be built.
pub fn build(
    config: Arc<ConfigV1>,
    navigator: Arc<dyn Navigator>,
) -> Result<ShellState, StartupError> {
    let backend = create_storage(&config.storage);
    let session = SessionStore::open(backend)?;
    let jar = Arc::new(CookieJar::for_storage(&config.storage)?);
    let signal = AuthSignal::new();
    let client = ApiClient::with_cookie_jar(
        &config.api,
        session.clone(),
        signal.clone(),
        navigator.clone(),
        jar,
    )?;
    let bootstrap = Arc::new(SessionBootstrap::new(client.clone()));

    Ok(ShellState {
        config,
        session,
        signal,
        navigator,
        account: Account::new(client.clone()),
        client,
        bootstrap,
    })
}

/// Builds the shell and resolves the initial session.
pub async fn run(
    config: Arc<ConfigV1>,
    navigator: Arc<dyn Navigator>,
) -> Result<(ShellState, AuthStatus), StartupError> {
    let state = build(config, navigator)?;
    let status = state.bootstrap.start().await;
    info!(
        event_name = "shell.started",
        event_domain = "shell",
        status = ?status,
        "Session resolved"
    );
    Ok((state, status))
}

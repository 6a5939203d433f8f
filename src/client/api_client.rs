use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::descriptor::{ApiResponse, Attempt, RequestDescriptor};
use super::error::ClientError;
use super::refresh::{InflightRefresh, Joined, RefreshOutcome};
use crate::config::ApiConfig;
use crate::models::token::RawGrant;
use crate::models::TokenGrant;
use crate::navigation::Navigator;
use crate::session::{CookieJar, SessionField, SessionStore};
use crate::signal::AuthSignal;
use crate::utils::log_throttle::LogThrottle;

const REFRESH_PATH: &str = "/auth/refresh";
const JOIN_LOG_WINDOW: Duration = Duration::from_secs(30);

/// HTTP client for the remote API.
///
/// Attaches the session's bearer token to every request and recovers from a
/// 401 by refreshing the token once and re-sending the request once. When the
/// refresh itself fails the session is expired: token and email are cleared and
/// the navigator is asked for a hard redirect to the login entry point.
///
/// Cheap to clone; clones share the session, the signal and the in-flight refresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    login_entry: String,
    oauth_entry: String,
    refresh_timeout: Duration,
    session: SessionStore,
    signal: AuthSignal,
    navigator: Arc<dyn Navigator>,
    inflight: Arc<InflightRefresh>,
    join_log: LogThrottle,
}

impl ApiClient {
    /// A client whose cookies live only as long as the process.
    pub fn new(
        config: &ApiConfig,
        session: SessionStore,
        signal: AuthSignal,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        Self::with_cookie_jar(
            config,
            session,
            signal,
            navigator,
            Arc::new(CookieJar::in_memory()),
        )
    }

    /// A client that keeps its cookies in `jar`, which carries the ambient refresh credential.
    pub fn with_cookie_jar(
        config: &ApiConfig,
        session: SessionStore,
        signal: AuthSignal,
        navigator: Arc<dyn Navigator>,
        jar: Arc<CookieJar>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_provider(jar).build()?;
        info!("Creating API client for '{}'", config.base_url);
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                login_entry: config.login_entry.clone(),
                oauth_entry: config.oauth_entry.clone(),
                refresh_timeout: config.refresh_timeout(),
                session,
                signal,
                navigator,
                inflight: Arc::default(),
                join_log: LogThrottle::new(JOIN_LOG_WINDOW),
            }),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn signal(&self) -> &AuthSignal {
        &self.inner.signal
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub fn login_entry(&self) -> &str {
        &self.inner.login_entry
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn oauth_entry(&self) -> &str {
        &self.inner.oauth_entry
    }

    /// Sends a request, refreshing and retrying once on a 401.
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ClientError> {
        self.request_with_attempt(descriptor, Attempt::Initial).await
    }

    /// Sends a request that is already at `attempt`. A `Retry` is never refreshed again.
    pub async fn request_with_attempt(
        &self,
        descriptor: &RequestDescriptor,
        attempt: Attempt,
    ) -> Result<ApiResponse, ClientError> {
        let mut attempt = attempt;
        let mut retry: Option<RequestDescriptor> = None;
        loop {
            let current = retry.as_ref().unwrap_or(descriptor);
            let outcome = self.inner.send(current).await;
            let refreshable = matches!(&outcome, Err(e) if e.is_unauthorized())
                && attempt == Attempt::Initial
                && !current.is_auth_endpoint();
            if !refreshable {
                return outcome;
            }

            debug!(
                "{} {} was rejected with 401, refreshing the session",
                current.method, current.path
            );
            let grant = self.refresh_or_expire().await?;
            retry = Some(current.with_bearer(&grant.access_token)?);
            attempt = Attempt::Retry;
        }
    }

    /// Refresh path used by the interceptor. Concurrent callers share one refresh;
    /// on failure the session is expired exactly once for all of them.
    ///
    /// The refresh runs on its own task: a caller that stops waiting does not
    /// stop it, and its side effects land even when nobody is left to observe them.
    pub(crate) async fn refresh_or_expire(&self) -> RefreshOutcome {
        let inner = self.inner.clone();
        let joined = self.inner.inflight.join_or_start(move |release| {
            let task = tokio::spawn(async move {
                let _release = release;
                inner.refresh_or_expire_once().await
            });
            async move {
                task.await
                    .unwrap_or_else(|e| Err(ClientError::Interrupted(e.to_string())))
            }
            .boxed()
            .shared()
        });

        let refresh = match joined {
            Joined::Started(refresh) => refresh,
            Joined::Waiting(refresh) => {
                if let Some(suppressed_count) = self.inner.join_log.admit() {
                    debug!(
                        event_name = "client.refresh.joined",
                        event_domain = "client",
                        suppressed_count,
                        "Joining refresh already in flight"
                    );
                }
                refresh
            }
        };
        refresh.await
    }

    /// Refresh without a prior failed request, e.g. at startup.
    ///
    /// Stores and announces a new token on success. A failure is returned as-is:
    /// nothing is cleared and no redirect happens.
    pub async fn silent_refresh(&self) -> RefreshOutcome {
        let grant = self.inner.call_refresh().await?;
        self.inner.store_grant(&grant);
        Ok(grant)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.request(&RequestDescriptor::get(path)).await
    }

    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        let body = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.request(&RequestDescriptor::post(path).with_json(body))
            .await
    }

    pub async fn post_empty(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.request(&RequestDescriptor::post(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.request(&RequestDescriptor::delete(path)).await
    }
}

impl Inner {
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let mut builder = self
            .http
            .request(descriptor.method.clone(), self.url(&descriptor.path))
            .headers(descriptor.headers.clone());

        if !descriptor.has_authorization() {
            if let Some(token) = self.session.access_token() {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(body) = &descriptor.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let outcome = into_api_response(response).await;
        if let Err(e) = &outcome {
            debug!("{} {} failed: {}", descriptor.method, descriptor.path, e);
        }
        outcome
    }

    /// One call to the refresh endpoint, bounded by the refresh timeout.
    async fn call_refresh(&self) -> RefreshOutcome {
        let exchange = async {
            let response = self.http.post(self.url(REFRESH_PATH)).send().await?;
            let raw: RawGrant = into_api_response(response).await?.json()?;
            raw.into_grant().ok_or(ClientError::MissingToken)
        };

        match timeout(self.refresh_timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::Timeout {
                after_ms: u64::try_from(self.refresh_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn refresh_or_expire_once(self: Arc<Self>) -> RefreshOutcome {
        match self.call_refresh().await {
            Ok(grant) => {
                info!(
                    event_name = "client.refresh.succeeded",
                    event_domain = "client",
                    "Access token refreshed"
                );
                self.store_grant(&grant);
                Ok(grant)
            }
            Err(e) => {
                warn!(
                    event_name = "client.refresh.failed",
                    event_domain = "client",
                    error = %e,
                    "Token refresh failed, ending the session"
                );
                self.expire_session();
                Err(e)
            }
        }
    }

    fn store_grant(&self, grant: &TokenGrant) {
        self.session.write(grant.session_updates());
        self.signal.announce();
    }

    fn expire_session(&self) {
        self.session
            .clear_all(&[SessionField::AccessToken, SessionField::Email]);
        self.signal.announce();
        self.navigator.hard_redirect(&self.login_entry);
    }
}

async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, ClientError> {
    let status: StatusCode = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;
    if status.is_success() {
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    } else {
        Err(ClientError::Status { status, body })
    }
}

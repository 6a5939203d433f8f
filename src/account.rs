//! User-facing account actions built on top of the API client.

use serde::Serialize;
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

use crate::client::{ApiClient, ClientError};
use crate::models::token::RawGrant;
use crate::models::{ApiEnvelope, TokenGrant, UserInfo};
use crate::session::{Session, SessionField};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const WITHDRAW_PATH: &str = "/auth/withdraw";
const USER_INFO_PATH: &str = "/v1/users/info";
const CALLBACK_TOKEN_PARAM: &str = "accessToken";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
}

/// Result of landing on the OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The callback carried no token; the user belongs on the login page.
    MissingToken,
    SignedIn(Session),
    /// The token was refused while loading the profile and could not be
    /// refreshed; the session has already been ended and the user sent to login.
    Expired,
}

#[derive(Clone)]
pub struct Account {
    client: ApiClient,
}

impl Account {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Signs in with email and password and stores the resulting session.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, ClientError> {
        let response = self
            .client
            .post_json(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        let raw: RawGrant = response.json()?;
        let mut grant = raw.into_grant().ok_or(ClientError::MissingToken)?;
        if grant.email.as_deref().map_or(true, str::is_empty) {
            grant.email = Some(email.to_string());
        }

        self.client.session().write(grant.session_updates());
        self.client.signal().announce();
        info!(
            event_name = "account.login.succeeded",
            event_domain = "account",
            "Signed in"
        );
        Ok(grant)
    }

    /// Creates an account. Nothing is stored; the user signs in afterwards.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(), ClientError> {
        self.client
            .post_json(
                REGISTER_PATH,
                &RegisterRequest {
                    email,
                    password,
                    full_name,
                },
            )
            .await?;
        info!("Registered account for '{}'", email);
        Ok(())
    }

    /// Finishes an OAuth sign-in from the callback's query string.
    ///
    /// The profile fetch is best effort: a signed-in session without a name is
    /// still a signed-in session.
    pub async fn complete_oauth_callback(&self, query: &str) -> CallbackOutcome {
        let query = query.trim_start_matches('?');
        let token = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == CALLBACK_TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let Some(token) = token else {
            warn!("OAuth callback carried no access token");
            return CallbackOutcome::MissingToken;
        };

        let session = self.client.session();
        session.set(SessionField::AccessToken, token);

        match self.fetch_profile().await {
            Ok(Some(user)) => {
                let mut updates = Vec::new();
                if let Some(email) = user.email {
                    updates.push((SessionField::Email, Some(email)));
                }
                if let Some(full_name) = user.full_name {
                    updates.push((SessionField::FullName, Some(full_name)));
                }
                session.write(updates);
            }
            Ok(None) => debug!("Profile response carried no user data"),
            Err(e) => warn!("Could not load profile after OAuth sign-in: {}", e),
        }

        if !session.has_access_token() {
            warn!(
                event_name = "account.oauth.expired",
                event_domain = "account",
                "OAuth token was rejected and the session has ended"
            );
            return CallbackOutcome::Expired;
        }

        self.client.signal().announce();
        info!(
            event_name = "account.oauth.succeeded",
            event_domain = "account",
            "Signed in through OAuth"
        );
        CallbackOutcome::SignedIn(session.snapshot())
    }

    /// Starts a provider sign-in: hard-redirects to the OAuth entry on the API
    /// host and returns where it went.
    ///
    /// A relative entry is resolved against the API base URL's origin, since the
    /// authorization endpoint sits beside the API rather than under it.
    pub fn begin_oauth_login(&self) -> Result<Url, ClientError> {
        let base = Url::parse(self.client.base_url())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.client.base_url(), e)))?;
        let target = base
            .join(self.client.oauth_entry())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.client.oauth_entry(), e)))?;
        info!(
            event_name = "account.oauth.started",
            event_domain = "account",
            target = %target,
            "Redirecting to OAuth provider"
        );
        self.client.navigator().hard_redirect(target.as_str());
        Ok(target)
    }

    async fn fetch_profile(&self) -> Result<Option<UserInfo>, ClientError> {
        let envelope: ApiEnvelope<UserInfo> = self.client.get(USER_INFO_PATH).await?.json()?;
        Ok(envelope.data)
    }

    /// Ends the session on the server if possible, and locally in any case.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let outcome = self.client.post_empty(LOGOUT_PATH).await.map(|_| ());
        self.end_session("logout", &outcome);
        outcome
    }

    /// Deletes the account. Local cleanup happens whatever the server answers.
    pub async fn withdraw(&self) -> Result<(), ClientError> {
        let outcome = self.client.delete(WITHDRAW_PATH).await.map(|_| ());
        self.end_session("withdraw", &outcome);
        outcome
    }

    fn end_session(&self, action: &str, outcome: &Result<(), ClientError>) {
        if let Err(e) = outcome {
            warn!(
                event_name = "account.session.remote_failed",
                event_domain = "account",
                action,
                error = %e,
                "Server did not confirm, clearing the local session anyway"
            );
        }
        self.client.session().clear_all(&SessionField::ALL);
        self.client.signal().announce();
        self.client.navigator().hard_redirect(self.client.login_entry());
    }
}

//! Route gating: which page a path shows for a given auth status.

use crate::bootstrap::AuthStatus;

pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const OAUTH_CALLBACK: &str = "/auth/callback";
pub const IMAGE_SEARCH: &str = "/image-search";
pub const CHAT: &str = "/chat";
pub const MY_PAGE: &str = "/mypage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Status not known yet, show a loading placeholder.
    Placeholder,
    Render,
    Redirect(&'static str),
}

/// Decides what to do with a navigation to `path`.
///
/// No decision is made while the session is still loading, so a returning user
/// is never bounced to the login page before the silent refresh had its chance.
pub fn decide(path: &str, status: AuthStatus) -> RouteDecision {
    let authenticated = match status {
        AuthStatus::Loading => return RouteDecision::Placeholder,
        AuthStatus::Authenticated => true,
        AuthStatus::Unauthenticated => false,
    };

    match normalize(path) {
        LOGIN if authenticated => RouteDecision::Redirect(CHAT),
        LOGIN | REGISTER | OAUTH_CALLBACK | IMAGE_SEARCH => RouteDecision::Render,
        "/" if authenticated => RouteDecision::Redirect(CHAT),
        "/" => RouteDecision::Redirect(LOGIN),
        CHAT | MY_PAGE if authenticated => RouteDecision::Render,
        CHAT | MY_PAGE => RouteDecision::Redirect(LOGIN),
        _ => RouteDecision::Redirect(CHAT),
    }
}

/// Drops the query string, fragment and any trailing slash.
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

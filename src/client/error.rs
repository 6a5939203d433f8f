use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by [`ApiClient`](super::ApiClient).
///
/// Cloneable so one refresh outcome can be handed to every request waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(Arc<reqwest::Error>),
    #[error("server answered {status}")]
    Status { status: StatusCode, body: String },
    #[error("refresh did not complete within {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("server answered without a usable access token")]
    MissingToken,
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("refresh task ended before completing: {0}")]
    Interrupted(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// The `message` field of a JSON error body, for page-level messaging.
    pub fn server_message(&self) -> Option<String> {
        let ClientError::Status { body, .. } = self else {
            return None;
        };
        serde_json::from_str::<Value>(body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_unauthorized() {
        let err = ClientError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

        let err = ClientError::Status {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        };
        assert!(!err.is_unauthorized());
        assert!(!ClientError::MissingToken.is_unauthorized());
    }

    #[test]
    fn test_server_message() {
        let err = ClientError::Status {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"success": false, "message": "Email already registered"}"#.to_string(),
        };
        assert_eq!(
            err.server_message().as_deref(),
            Some("Email already registered")
        );

        let err = ClientError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>bad gateway</html>".to_string(),
        };
        assert_eq!(err.server_message(), None);
        assert_eq!(ClientError::Timeout { after_ms: 10 }.server_message(), None);
    }
}

use serde::{Deserialize, Serialize};

use crate::session::SessionField;

/// Body returned by the refresh and login endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TokenGrant {
    /// Session fields to write for this grant. The email is only touched when the
    /// server returned one, an existing email is never erased by a refresh.
    pub fn session_updates(&self) -> Vec<(SessionField, Option<String>)> {
        let mut updates = vec![(SessionField::AccessToken, Some(self.access_token.clone()))];
        if let Some(email) = self.email.as_ref().filter(|e| !e.is_empty()) {
            updates.push((SessionField::Email, Some(email.clone())));
        }
        updates
    }
}

/// Looser shape used to decode grants: the server may omit or blank the token.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RawGrant {
    /// A grant is only usable when it carries a non-empty token.
    pub fn into_grant(self) -> Option<TokenGrant> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        Some(TokenGrant {
            access_token,
            email: self.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_without_email_leave_email_alone() {
        let grant = TokenGrant {
            access_token: "xyz".to_string(),
            email: None,
        };
        assert_eq!(
            grant.session_updates(),
            vec![(SessionField::AccessToken, Some("xyz".to_string()))]
        );
    }

    #[test]
    fn test_raw_grant_requires_token() {
        let raw: RawGrant = serde_json::from_str(r#"{"email": "a@b.c"}"#).unwrap();
        assert!(raw.into_grant().is_none());

        let raw: RawGrant = serde_json::from_str(r#"{"accessToken": ""}"#).unwrap();
        assert!(raw.into_grant().is_none());

        let raw: RawGrant =
            serde_json::from_str(r#"{"accessToken": "xyz", "email": "a@b.c", "refreshToken": "r"}"#)
                .unwrap();
        assert_eq!(
            raw.into_grant(),
            Some(TokenGrant {
                access_token: "xyz".to_string(),
                email: Some("a@b.c".to_string()),
            })
        );
    }
}

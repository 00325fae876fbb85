//! `OAuth2` token types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived access token obtained from a refresh-token exchange.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Rotated refresh token, when the provider issued a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope granted by authorization server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl AccessToken {
    /// Creates a new bearer token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }

    /// Sets the rotated refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// Token material stays out of logs and panic messages.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Raw JSON body returned by a token endpoint, success or failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenEndpointResponse {
    /// Access token (success).
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (success).
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds (success).
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Rotated refresh token (success).
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Scope (success).
    #[serde(default)]
    pub scope: Option<String>,
    /// Error code (failure).
    #[serde(default)]
    pub error: Option<String>,
    /// Error description (failure).
    #[serde(default)]
    pub error_description: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = AccessToken::new("access123");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none());
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn test_token_expiration() {
        let expired =
            AccessToken::new("a").with_expires_at(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());

        let valid = AccessToken::new("a").with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let token = AccessToken::new("secret-access").with_refresh_token("secret-refresh");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert!(debug.contains("has_refresh_token: true"));
    }

    #[test]
    fn test_endpoint_response_partial_fields() {
        let json = r#"{"error":"invalid_grant","error_description":"AADSTS70000"}"#;
        let response: TokenEndpointResponse = serde_json::from_str(json).unwrap();
        assert!(response.access_token.is_none());
        assert_eq!(response.error.as_deref(), Some("invalid_grant"));
    }
}

//! Refresh-token exchange.

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::{AccessToken, TokenEndpointResponse};
use chrono::{Duration, Utc};
use reqwest::Client;
use std::future::Future;
use tracing::{debug, info, warn};

/// Result of a refresh-token exchange that reached the provider.
#[derive(Debug, Clone)]
pub enum TokenOutcome {
    /// The access token can be used immediately.
    Success(AccessToken),
    /// The provider reported the account as blocked or the credentials as
    /// unusable.
    AccountBlocked {
        /// Provider's error description.
        description: String,
    },
    /// Any other provider-reported failure.
    Failure {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Provider's error description.
        description: String,
    },
}

impl TokenOutcome {
    /// Converts a non-success outcome into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountBlocked`] or [`Error::OAuth`] for failures.
    pub fn into_result(self) -> Result<AccessToken> {
        match self {
            Self::Success(token) => Ok(token),
            Self::AccountBlocked { description } => Err(Error::AccountBlocked(description)),
            Self::Failure { error, description } => Err(Error::oauth_error(error, description)),
        }
    }
}

/// Exchanges a long-lived refresh token for an access token.
pub trait TokenExchange: Send + Sync {
    /// Performs one exchange.
    ///
    /// Transport and decoding problems are errors; provider-reported
    /// failures are returned as a [`TokenOutcome`].
    fn exchange(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> impl Future<Output = Result<TokenOutcome>> + Send;
}

/// HTTP client for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct RefreshClient {
    provider: Provider,
    http_client: Client,
}

impl RefreshClient {
    /// Creates a client for the given provider.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            http_client: Client::new(),
        }
    }

    /// Returns the provider configuration.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }
}

impl TokenExchange for RefreshClient {
    async fn exchange(&self, refresh_token: &str, client_id: &str) -> Result<TokenOutcome> {
        let params = [
            ("client_id", client_id),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!(provider = %self.provider.name, "requesting access token");
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .header(
                reqwest::header::USER_AGENT,
                concat!("unimail/", env!("CARGO_PKG_VERSION")),
            )
            .form(&params)
            .send()
            .await?;

        // Error bodies carry JSON too, so the status is only used for context.
        let status = response.status();
        let body = response.text().await?;
        let parsed: TokenEndpointResponse = serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!("HTTP {status}: {e}"))
        })?;

        let outcome = classify(&self.provider, parsed)?;
        match &outcome {
            TokenOutcome::Success(_) => info!(provider = %self.provider.name, "access token obtained"),
            TokenOutcome::AccountBlocked { .. } => {
                warn!(provider = %self.provider.name, "token exchange rejected: account blocked");
            }
            TokenOutcome::Failure { error, .. } => {
                warn!(provider = %self.provider.name, %status, error = %error, "token exchange failed");
            }
        }
        Ok(outcome)
    }
}

/// Classifies a token endpoint response.
///
/// # Errors
///
/// Returns an error if the response has neither an error nor an access token.
pub fn classify(provider: &Provider, response: TokenEndpointResponse) -> Result<TokenOutcome> {
    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        let description = response.error_description.unwrap_or_default();
        let blocked = provider
            .blocked_phrase
            .as_deref()
            .is_some_and(|phrase| description.contains(phrase));

        return Ok(if blocked {
            TokenOutcome::AccountBlocked { description }
        } else {
            TokenOutcome::Failure { error, description }
        });
    }

    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::InvalidResponse("missing access_token".into()))?;

    let mut token = AccessToken::new(access_token);
    if let Some(token_type) = response.token_type {
        token.token_type = token_type;
    }
    token.expires_at = response
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs));
    token.refresh_token = response.refresh_token.filter(|t| !t.is_empty());
    token.scope = response.scope;

    Ok(TokenOutcome::Success(token))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TokenEndpointResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classify_success_with_rotation() {
        let provider = Provider::microsoft().unwrap();
        let outcome = classify(
            &provider,
            parse(r#"{"token_type":"Bearer","expires_in":3599,"access_token":"at","refresh_token":"rt2"}"#),
        )
        .unwrap();

        let token = outcome.into_result().unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt2"));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_classify_blocked() {
        let provider = Provider::microsoft().unwrap();
        let outcome = classify(
            &provider,
            parse(
                r#"{"error":"invalid_grant","error_description":"AADSTS70000: User account is found to be in service abuse mode."}"#,
            ),
        )
        .unwrap();

        assert!(matches!(outcome, TokenOutcome::AccountBlocked { .. }));
        assert!(matches!(outcome.into_result(), Err(Error::AccountBlocked(_))));
    }

    #[test]
    fn test_classify_generic_failure() {
        let provider = Provider::microsoft().unwrap();
        let outcome = classify(
            &provider,
            parse(r#"{"error":"invalid_client","error_description":"bad client"}"#),
        )
        .unwrap();

        match outcome {
            TokenOutcome::Failure { error, description } => {
                assert_eq!(error, "invalid_client");
                assert_eq!(description, "bad client");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_missing_token() {
        let provider = Provider::microsoft().unwrap();
        assert!(classify(&provider, parse("{}")).is_err());
    }

    #[tokio::test]
    async fn test_exchange_transport_error() {
        let provider = Provider::new("Local", "http://127.0.0.1:9/token").unwrap();
        let client = RefreshClient::new(provider);
        let result = client.exchange("rt", "cid").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}

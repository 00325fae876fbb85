//! Access-token resolution for delegated-auth hosts.

use tracing::{info, warn};
use unimail_oauth::{AccessToken, TokenExchange};

use crate::{Error, Result};

/// Exchanges a refresh token for an access token.
///
/// # Errors
///
/// - [`Error::AccountBlocked`] when the provider reports the account blocked
/// - [`Error::Authentication`] for any other provider-reported failure or a
///   transport error, or an access token that is already expired
pub async fn resolve_access_token<E>(
    exchange: &E,
    refresh_token: &str,
    client_id: &str,
) -> Result<AccessToken>
where
    E: TokenExchange + ?Sized,
{
    let outcome = exchange
        .exchange(refresh_token, client_id)
        .await
        .map_err(|e| Error::Authentication(format!("token exchange failed: {e}")))?;

    let token = outcome.into_result().map_err(|e| match e {
        unimail_oauth::Error::AccountBlocked(description) => {
            warn!("identity provider reports the account as blocked");
            Error::AccountBlocked(description)
        }
        other => Error::Authentication(format!("token exchange rejected: {other}")),
    })?;

    if token.is_expired() {
        return Err(Error::Authentication(
            "token exchange returned an expired access token".into(),
        ));
    }
    info!(rotated = token.refresh_token.is_some(), "access token resolved");
    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use unimail_oauth::TokenOutcome;

    struct Fixed(fn() -> unimail_oauth::Result<TokenOutcome>);

    impl TokenExchange for Fixed {
        async fn exchange(
            &self,
            _refresh_token: &str,
            _client_id: &str,
        ) -> unimail_oauth::Result<TokenOutcome> {
            (self.0)()
        }
    }

    #[tokio::test]
    async fn test_success() {
        let exchange = Fixed(|| Ok(TokenOutcome::Success(AccessToken::new("at"))));
        let token = resolve_access_token(&exchange, "rt", "cid").await.unwrap();
        assert_eq!(token.access_token, "at");
    }

    #[tokio::test]
    async fn test_blocked_is_distinct() {
        let exchange = Fixed(|| {
            Ok(TokenOutcome::AccountBlocked {
                description: "User account is found to be in service abuse mode".into(),
            })
        });
        let err = resolve_access_token(&exchange, "rt", "cid").await.unwrap_err();
        assert!(matches!(err, Error::AccountBlocked(_)));
    }

    #[tokio::test]
    async fn test_failure_and_transport_error() {
        let exchange = Fixed(|| {
            Ok(TokenOutcome::Failure {
                error: "invalid_grant".into(),
                description: "expired".into(),
            })
        });
        let err = resolve_access_token(&exchange, "rt", "cid").await.unwrap_err();
        assert!(matches!(&err, Error::Authentication(m) if m.contains("invalid_grant")));

        let exchange = Fixed(|| Err(unimail_oauth::Error::InvalidResponse("html".into())));
        let err = resolve_access_token(&exchange, "rt", "cid").await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let exchange = Fixed(|| {
            let token =
                AccessToken::new("at").with_expires_at(Utc::now() - Duration::seconds(120));
            Ok(TokenOutcome::Success(token))
        });
        let err = resolve_access_token(&exchange, "rt", "cid").await.unwrap_err();
        assert!(matches!(&err, Error::Authentication(m) if m.contains("expired")));
    }
}

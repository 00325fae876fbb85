//! Error types for token exchange.

/// Result type alias for token exchange.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of provider lookup, the token request, or its outcome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token endpoint could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the refresh-token grant.
    #[error("token endpoint returned {error}: {description}")]
    OAuth {
        /// Error code, e.g. `invalid_grant`.
        error: String,
        /// Provider's description.
        description: String,
    },

    /// The provider reports the account as blocked.
    #[error("Account blocked: {0}")]
    AccountBlocked(String),

    /// The endpoint answered with something other than a token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// A provider entry is unusable.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// A provider endpoint is not a valid URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Creates [`Error::OAuth`] from a provider error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }
}

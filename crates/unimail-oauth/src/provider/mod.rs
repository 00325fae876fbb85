//! Delegated-auth provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Mail hosts that require a token exchange instead of a password login.
const DELEGATED_HOSTS: &[(&str, fn() -> Result<Provider>)] =
    &[("outlook.office365.com", Provider::microsoft)];

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Phrase in `error_description` that marks a blocked account.
    pub blocked_phrase: Option<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(name: impl Into<String>, token_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            token_url: Url::parse(token_url.as_ref())?,
            blocked_phrase: None,
        })
    }

    /// Sets the blocked-account phrase.
    #[must_use]
    pub fn with_blocked_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.blocked_phrase = Some(phrase.into());
        self
    }

    /// Microsoft identity platform (Outlook / Office 365).
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn microsoft() -> Result<Self> {
        Ok(Self::new(
            "Microsoft",
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        )?
        .with_blocked_phrase("User account is found to be in service abuse mode"))
    }

    /// Looks up the provider for a mail host, if that host uses delegated
    /// authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration is invalid.
    pub fn for_mail_host(host: &str) -> Result<Option<Self>> {
        DELEGATED_HOSTS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(host.trim()))
            .map(|(_, build)| build())
            .transpose()
    }

    /// Returns true if the host uses delegated authentication.
    #[must_use]
    pub fn is_delegated_host(host: &str) -> bool {
        DELEGATED_HOSTS
            .iter()
            .any(|(known, _)| known.eq_ignore_ascii_case(host.trim()))
    }

    /// Validates that the token endpoint is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.token_url.scheme(), "https" | "http") {
            return Err(Error::InvalidConfig(format!(
                "token_url must be http(s): {}",
                self.token_url
            )));
        }
        Ok(())
    }
}

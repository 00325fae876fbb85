//! Connection parameters and protocol selection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unimail_oauth::Provider;

use crate::{Error, Result};

/// Wire protocol selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// IMAP over implicit TLS.
    Imap,
    /// POP3 over implicit TLS.
    Pop3,
    /// SMTP; recognized but not implemented for retrieval.
    Smtp,
}

impl Protocol {
    /// Maps a numeric selector: `0` IMAP, `1` POP3, `2` SMTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedProtocol`] for any other number.
    pub fn from_selector(selector: i64) -> Result<Self> {
        match selector {
            0 => Ok(Self::Imap),
            1 => Ok(Self::Pop3),
            2 => Ok(Self::Smtp),
            other => Err(Error::UnsupportedProtocol(other.to_string())),
        }
    }

    /// Conventional implicit-TLS port.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Imap => 993,
            Self::Pop3 => 995,
            Self::Smtp => 465,
        }
    }

    /// Lowercase protocol name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Pop3 => "pop3",
            Self::Smtp => "smtp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "imap" => Ok(Self::Imap),
            "pop3" => Ok(Self::Pop3),
            "smtp" => Ok(Self::Smtp),
            _ => s
                .parse::<i64>()
                .map_or_else(|_| Err(Error::UnsupportedProtocol(s.to_string())), Self::from_selector),
        }
    }
}

/// Protocol as written in a configuration file: a name or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Selector {
    Number(i64),
    Name(String),
}

impl Selector {
    fn resolve(&self) -> Result<Protocol> {
        match self {
            Self::Number(n) => Protocol::from_selector(*n),
            Self::Name(name) => name.parse(),
        }
    }
}

/// Serialized form of [`LoginParams`].
#[derive(Debug, Clone, Deserialize)]
struct RawLoginParams {
    host: String,
    port: Option<u16>,
    user: String,
    #[serde(default)]
    password: String,
    protocol: Selector,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TryFrom<RawLoginParams> for LoginParams {
    type Error = Error;

    fn try_from(raw: RawLoginParams) -> Result<Self> {
        let protocol = raw.protocol.resolve()?;
        Ok(Self {
            port: raw.port.unwrap_or_else(|| protocol.default_port()),
            host: raw.host,
            user: raw.user,
            password: raw.password,
            protocol,
            client_id: raw.client_id,
            refresh_token: raw.refresh_token,
        })
    }
}

/// Everything needed to open and authenticate a session.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawLoginParams")]
pub struct LoginParams {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Account user name.
    pub user: String,
    /// Account password; unused for delegated-auth hosts.
    #[serde(skip_serializing)]
    pub password: String,
    /// Wire protocol.
    pub protocol: Protocol,
    /// OAuth2 client id for delegated-auth hosts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OAuth2 refresh token for delegated-auth hosts.
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("protocol", &self.protocol)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl LoginParams {
    /// Creates parameters for direct username/password authentication.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            protocol,
            client_id: None,
            refresh_token: None,
        }
    }

    /// Adds the OAuth2 client id and refresh token.
    #[must_use]
    pub fn with_oauth(
        mut self,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Parses parameters from JSON.
    ///
    /// `port` may be omitted (the protocol's implicit-TLS port is used) and
    /// `protocol` may be a name or a numeric selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedProtocol`] for an unknown selector and
    /// [`Error::Config`] for any other problem.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawLoginParams =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Reads parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, otherwise as
    /// [`LoginParams::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Returns true if the host requires an OAuth2 token exchange.
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        Provider::is_delegated_host(&self.host)
    }

    /// Checks that the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty host or user, a zero port, or
    /// a delegated-auth host without both client id and refresh token.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host is required".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be 1-65535".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(Error::Config("user is required".to_string()));
        }
        if self.is_delegated() {
            let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
            if !present(&self.client_id) || !present(&self.refresh_token) {
                return Err(Error::Config(format!(
                    "{} requires client_id and refresh_token",
                    self.host
                )));
            }
        }
        Ok(())
    }
}

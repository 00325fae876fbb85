//! Implicit-TLS transport.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::Result;

/// TLS stream used by live IMAP sessions.
pub type ImapStream = TlsStream<TcpStream>;

/// Creates a TLS connector trusting the Mozilla root set.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Opens a TCP connection and performs the TLS handshake (port 993 style).
///
/// # Errors
///
/// Returns an error if the host is not a valid server name, the TCP
/// connection fails, or the handshake fails.
pub async fn connect_tls(host: &str, port: u16) -> Result<ImapStream> {
    let server_name = ServerName::try_from(host.to_string())?;
    let tcp = TcpStream::connect((host, port)).await?;
    debug!(host, port, "tcp connected, starting tls handshake");

    let tls = create_tls_connector().connect(server_name, tcp).await?;
    Ok(tls)
}

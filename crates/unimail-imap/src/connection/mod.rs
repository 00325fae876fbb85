//! Connection management: transport and framing.

mod framed;
mod stream;

pub use framed::FramedStream;
pub use stream::{ImapStream, connect_tls, create_tls_connector};

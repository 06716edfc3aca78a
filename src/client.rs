//! High-level client wiring.
//!
//! Builds a [`ConnectionDriver`] over a non-blocking TCP stream. Process
//! concerns - the reactor loop itself, CLI parsing, loading the peer key
//! from disk - stay with the embedding application.

use std::net::{SocketAddr, TcpStream};

use tracing::debug;

use crate::core::ChannelError;
use crate::crypto::keywrap::PeerPublicKey;
use crate::crypto::session::{Role, SessionState};
use crate::transport::driver::{ConnectionDriver, Readiness};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub server_addr: SocketAddr,
    /// The server's static RSA public key, PEM encoded.
    pub server_public_key_pem: String,
}

/// Builder for a client connection.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    server_addr: Option<SocketAddr>,
    server_public_key_pem: Option<String>,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server address.
    pub fn server_addr(mut self, addr: SocketAddr) -> Self {
        self.server_addr = Some(addr);
        self
    }

    /// Set the server's PEM-encoded public key.
    pub fn server_public_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.server_public_key_pem = Some(pem.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns an I/O error naming the missing field if incomplete.
    pub fn build(self) -> Result<ClientConfig, ChannelError> {
        let server_addr = self
            .server_addr
            .ok_or_else(|| missing_field("server_addr"))?;
        let server_public_key_pem = self
            .server_public_key_pem
            .ok_or_else(|| missing_field("server_public_key_pem"))?;
        Ok(ClientConfig {
            server_addr,
            server_public_key_pem,
        })
    }
}

fn missing_field(name: &str) -> ChannelError {
    std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("client config missing {name}"),
    )
    .into()
}

/// Connect to the server and return a registered driver.
///
/// The TCP stream is switched to non-blocking mode before registration;
/// the caller runs the readiness loop and dispatches notifications into
/// the driver, starting the handshake with
/// [`ConnectionDriver::queue_login`].
pub fn connect<R: Readiness>(
    config: &ClientConfig,
    readiness: R,
) -> Result<ConnectionDriver<TcpStream, R>, ChannelError> {
    let peer = PeerPublicKey::from_pem(&config.server_public_key_pem)?;

    let stream = TcpStream::connect(config.server_addr)?;
    stream.set_nonblocking(true)?;
    debug!(addr = %config.server_addr, "connected");

    let session = SessionState::new(Role::Initiator).with_peer(peer);
    ConnectionDriver::new(stream, readiness, session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_complete() {
        let config = ClientConfigBuilder::new()
            .server_addr("127.0.0.1:5150".parse().unwrap())
            .server_public_key_pem("-----BEGIN PUBLIC KEY-----")
            .build()
            .unwrap();

        assert_eq!(config.server_addr.port(), 5150);
    }

    #[test]
    fn test_builder_missing_fields() {
        assert!(ClientConfigBuilder::new().build().is_err());
        assert!(ClientConfigBuilder::new()
            .server_addr("127.0.0.1:5150".parse().unwrap())
            .build()
            .is_err());
    }
}

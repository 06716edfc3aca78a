//! # TETHER Protocol
//!
//! TETHER is a secure point-to-point messaging core for one client
//! connection over a byte stream. It provides:
//!
//! - **Framing**: length-prefixed binary frames with authenticated
//!   encryption (AES-256-GCM, header bound as associated data)
//! - **Anti-replay**: strictly monotonic sequence counters, reinforced by
//!   embedding the sequence number in the AEAD nonce
//! - **Handshake**: a fresh per-connection session key, delivered
//!   RSA-OAEP-wrapped under the peer's static public key
//! - **Non-blocking I/O**: a readiness-driven driver that interleaves
//!   partial reads and writes with protocol parsing
//!
//! The readiness facility (reactor), logging setup and key-file loading
//! are external collaborators; the crate exposes a [`transport::Readiness`]
//! trait seam for the reactor.
//!
//! ## Modules
//!
//! - [`core`]: Constants and error types
//! - [`crypto`]: AEAD, key wrapping, session state, handshake
//! - [`transport`]: Wire framing and the connection driver
//! - [`client`]: Client-side connection wiring
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tether_protocol::prelude::*;
//!
//! let config = ClientConfigBuilder::new()
//!     .server_addr("127.0.0.1:5150".parse()?)
//!     .server_public_key_pem(pem)
//!     .build()?;
//!
//! let mut driver = tether_protocol::client::connect(&config, readiness)?;
//! driver.queue_login(b"")?;
//!
//! // reactor loop: dispatch notifications into the driver
//! loop {
//!     let payloads = driver.process_ready(readable, writable)?;
//!     for payload in payloads {
//!         // handle decrypted application payloads
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod core;
pub mod crypto;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::{ClientConfig, ClientConfigBuilder};
    pub use crate::core::{ChannelError, CryptoError};
    pub use crate::crypto::{
        HandshakeEngine, HandshakePhase, PeerPublicKey, Role, SessionKey, SessionState,
    };
    pub use crate::transport::{
        ConnectionDriver, FrameError, FrameHeader, FrameType, Interest, Readiness,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{ChannelError, CryptoError};
pub use crate::crypto::{HandshakePhase, PeerPublicKey, SessionKey, SessionState};
pub use crate::transport::{ConnectionDriver, FrameType, Interest, Readiness};

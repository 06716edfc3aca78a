//! Ephemeral-key handshake for the initiator role.
//!
//! The handshake is a single exchange: generate a fresh 256-bit session
//! key, send it RSA-OAEP-wrapped inside a login frame, and consider the
//! channel established once the peer's first response authenticates under
//! that key. One key per connection lifetime - no rekeying. That is an
//! explicit protocol simplification, not an omission.

use tracing::debug;

use crate::core::{ChannelError, CryptoError};
use crate::transport::frame::FrameType;

use super::aead::SessionKey;
use super::session::SessionState;

/// Handshake progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// No key generated yet.
    Idle,
    /// Key generated and login frame built, not yet queued.
    KeyGenerated,
    /// Login frame queued for transmission.
    KeySent,
    /// First authenticated response received under the session key.
    Established,
}

/// Drives the login handshake against a [`SessionState`].
#[derive(Debug)]
pub struct HandshakeEngine {
    phase: HandshakePhase,
}

impl HandshakeEngine {
    /// Create an engine in the idle phase.
    pub fn new() -> Self {
        Self {
            phase: HandshakePhase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Whether the handshake has completed.
    pub fn is_established(&self) -> bool {
        self.phase == HandshakePhase::Established
    }

    /// Generate a fresh session key, install it into the session and
    /// build the login frame carrying the wrapped key.
    ///
    /// Transitions Idle -> KeyGenerated.
    pub fn initiate(
        &mut self,
        session: &mut SessionState,
        payload: &[u8],
    ) -> Result<Vec<u8>, ChannelError> {
        if self.phase != HandshakePhase::Idle {
            return Err(CryptoError::HandshakeFailed(format!(
                "login already initiated (phase {:?})",
                self.phase
            ))
            .into());
        }

        session.install_key(SessionKey::generate());
        let frame = session.seal(FrameType::LOGIN, payload)?;

        self.phase = HandshakePhase::KeyGenerated;
        debug!(frame_len = frame.len(), "login frame built");
        Ok(frame)
    }

    /// Record that the login frame has been queued for transmission.
    ///
    /// Transitions KeyGenerated -> KeySent.
    pub fn mark_sent(&mut self) {
        if self.phase == HandshakePhase::KeyGenerated {
            self.phase = HandshakePhase::KeySent;
        }
    }

    /// Record an inbound frame that authenticated under the session key.
    ///
    /// Transitions KeySent -> Established on the first such frame.
    pub fn on_authenticated_frame(&mut self) {
        if self.phase == HandshakePhase::KeySent {
            self.phase = HandshakePhase::Established;
            debug!("handshake established");
        }
    }
}

impl Default for HandshakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

//! Error types for the TETHER protocol.

use thiserror::Error;

use crate::transport::frame::FrameError;

/// Errors in the crypto layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD verification failed (invalid tag or corrupted frame).
    #[error("AEAD verification failed (invalid tag or corrupted frame)")]
    AuthenticationFailure,

    /// Inbound sequence number did not advance past the last accepted one.
    #[error("sequence number {got} not greater than last accepted {last}")]
    ReplayOrReorder {
        /// Last accepted sequence number.
        last: u16,
        /// Sequence number carried by the rejected frame.
        got: u16,
    },

    /// Send sequence counter exhausted - session must terminate.
    #[error("send sequence counter exhausted - session must terminate")]
    SequenceExhausted,

    /// No session key installed yet.
    #[error("no session key installed")]
    MissingSessionKey,

    /// No peer public key available for key wrapping.
    #[error("no peer public key available")]
    MissingPeerKey,

    /// RSA-OAEP key wrapping failed.
    #[error("RSA-OAEP key wrapping failed")]
    KeyWrapFailed,

    /// RSA-OAEP key unwrapping failed.
    #[error("RSA-OAEP key unwrapping failed")]
    KeyUnwrapFailed,

    /// Peer public key could not be parsed.
    #[error("invalid peer public key: {0}")]
    InvalidPeerKey(String),

    /// Handshake driven in the wrong phase.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
}

/// Top-level TETHER errors.
///
/// Every variant is fatal to the connection: the driver tears the
/// connection down and reports the error to its owner.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Framing error (malformed or mis-sized frame).
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// Crypto error (authentication, replay, key handling).
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The peer closed the connection (zero-length read).
    #[error("peer closed the connection")]
    PeerClosed,

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Whether this error is an AEAD authentication failure.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::AuthenticationFailure))
    }

    /// Whether this error is a replay/reorder rejection.
    pub fn is_replay_or_reorder(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::ReplayOrReorder { .. }))
    }
}

//! Security layer: AEAD framing crypto, key wrapping, session state and
//! the login handshake.

pub mod aead;
pub mod handshake;
pub mod keywrap;
pub mod session;

pub use aead::SessionKey;
pub use handshake::{HandshakeEngine, HandshakePhase};
pub use keywrap::{unwrap_session_key, wrap_session_key, PeerPublicKey};
pub use session::{decode_frame, encode_frame, Role, SessionState};

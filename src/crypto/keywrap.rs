//! RSA-OAEP session-key wrapping.
//!
//! During login the freshly generated session key is encrypted under the
//! peer's static RSA public key (supplied out of band, PEM encoded) and
//! appended to the login frame. OAEP uses SHA-1 for wire compatibility
//! with the reference peer.

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::core::{CryptoError, SESSION_KEY_SIZE, WRAPPED_KEY_SIZE};

use super::aead::SessionKey;

/// The peer's static RSA public key, used to wrap session keys.
///
/// This is the peer's long-term identity from the protocol's point of
/// view.
#[derive(Clone, Debug)]
pub struct PeerPublicKey {
    key: RsaPublicKey,
}

impl PeerPublicKey {
    /// Parse a PEM-encoded public key.
    ///
    /// Accepts both SubjectPublicKeyInfo (`BEGIN PUBLIC KEY`) and PKCS#1
    /// (`BEGIN RSA PUBLIC KEY`) encodings.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| CryptoError::InvalidPeerKey(e.to_string()))?;
        Self::from_key(key)
    }

    /// Wrap an already-parsed RSA public key.
    pub fn from_key(key: RsaPublicKey) -> Result<Self, CryptoError> {
        // The wire format reserves exactly 256 bytes for the wrapped key,
        // so only 2048-bit moduli are usable.
        if key.size() != WRAPPED_KEY_SIZE {
            return Err(CryptoError::InvalidPeerKey(format!(
                "modulus is {} bytes, expected {WRAPPED_KEY_SIZE}",
                key.size()
            )));
        }
        Ok(Self { key })
    }

    /// Access the underlying RSA key.
    pub fn as_rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

/// RSA-OAEP-encrypt a session key under the peer's public key.
///
/// Returns exactly [`WRAPPED_KEY_SIZE`] bytes.
pub fn wrap_session_key(peer: &PeerPublicKey, key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    let padding = Oaep::new::<Sha1>();
    let wrapped = peer
        .key
        .encrypt(&mut OsRng, padding, key.as_bytes())
        .map_err(|_| CryptoError::KeyWrapFailed)?;

    debug_assert_eq!(wrapped.len(), WRAPPED_KEY_SIZE);
    Ok(wrapped)
}

/// Recover a session key from its RSA-OAEP-wrapped form.
///
/// Only the peer holds the matching private key in production; this is
/// exercised locally by tests and by a future responder role.
pub fn unwrap_session_key(
    private_key: &RsaPrivateKey,
    wrapped: &[u8],
) -> Result<SessionKey, CryptoError> {
    let padding = Oaep::new::<Sha1>();
    let raw = private_key
        .decrypt(padding, wrapped)
        .map_err(|_| CryptoError::KeyUnwrapFailed)?;

    let key: [u8; SESSION_KEY_SIZE] = raw
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::KeyUnwrapFailed)?;
    Ok(SessionKey::from_bytes(key))
}

//! AES-256-GCM AEAD encryption.
//!
//! All frames use AES-256-GCM with a 12-byte authentication tag. The AAD
//! is the raw 16-byte frame header, so any header tampering invalidates
//! the tag even though the header travels unencrypted. The nonce is built
//! from header fields:
//! - Sequence number (2 bytes, BE)
//! - Random salt (6 bytes)

use aes_gcm::aead::consts::{U8, U12};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::core::{CryptoError, NONCE_SIZE, RANDOM_SIZE, SESSION_KEY_SIZE, TAG_SIZE};

/// AES-256-GCM parameterized for the TETHER wire format: 8-byte nonce,
/// 12-byte tag.
type FrameCipher = AesGcm<Aes256, U8, U12>;

/// A symmetric session key for AEAD operations.
///
/// Zeroized on drop for security.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut key = [0u8; SESSION_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create a session key from bytes.
    pub fn from_bytes(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Generate a fresh 6-byte random nonce-salt for a frame header.
pub fn generate_salt() -> [u8; RANDOM_SIZE] {
    let mut salt = [0u8; RANDOM_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Construct the 8-byte AEAD nonce from header fields.
///
/// Layout:
/// ```text
/// [ sqn (2, BE) | rnd (6) ]
/// ```
///
/// Embedding the sequence number means a stale frame replayed with its
/// original salt fails tag verification once the counter has moved on,
/// independently of the explicit sequence check.
pub fn construct_nonce(sqn: u16, salt: &[u8; RANDOM_SIZE]) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0..2].copy_from_slice(&sqn.to_be_bytes());
    nonce[2..8].copy_from_slice(salt);
    nonce
}

/// Encrypt plaintext using AES-256-GCM.
///
/// # Arguments
/// * `key` - 32-byte session key
/// * `nonce` - 8-byte nonce (sqn + salt)
/// * `aad` - Additional authenticated data (the raw frame header)
/// * `plaintext` - Data to encrypt
///
/// # Returns
/// Ciphertext with appended 12-byte GCM tag.
pub fn encrypt(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = FrameCipher::new(key.as_bytes().into());
    let nonce = Nonce::<U8>::from_slice(nonce);

    cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext using AES-256-GCM.
///
/// # Arguments
/// * `key` - 32-byte session key
/// * `nonce` - 8-byte nonce (sqn + salt, reconstructed from the header)
/// * `aad` - Additional authenticated data (the raw frame header)
/// * `ciphertext` - Ciphertext with appended 12-byte GCM tag
///
/// # Returns
/// Decrypted plaintext, or `AuthenticationFailure` if verification fails.
pub fn decrypt(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailure);
    }

    let cipher = FrameCipher::new(key.as_bytes().into());
    let nonce = Nonce::<U8>::from_slice(nonce);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AuthenticationFailure)
}

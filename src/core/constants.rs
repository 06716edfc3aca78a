//! Protocol constants for the TETHER wire format.
//!
//! These values are fixed by the protocol and MUST NOT be changed.

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Protocol version (v1.0), first two bytes of every frame.
pub const PROTOCOL_VERSION: u16 = 0x0100;

/// Frame header size (version + type + length + sqn + rnd + rsv).
pub const HEADER_SIZE: usize = 16;

/// GCM authentication tag size.
pub const TAG_SIZE: usize = 12;

/// Random nonce-salt size in the header.
pub const RANDOM_SIZE: usize = 6;

/// AEAD nonce size: sqn (2 bytes) followed by the random salt (6 bytes).
pub const NONCE_SIZE: usize = 2 + RANDOM_SIZE;

/// Minimum frame size (header + empty ciphertext + tag).
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + TAG_SIZE;

/// Maximum frame size encodable in the 2-byte length field.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// AES-256 session key size.
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of the RSA-OAEP-wrapped session key appended to login frames
/// (2048-bit RSA modulus).
pub const WRAPPED_KEY_SIZE: usize = 256;

// =============================================================================
// FRAME TYPES
// =============================================================================

/// Login frame type; all other type values are reserved.
pub const TYPE_LOGIN: u16 = 0x0000;

// =============================================================================
// TRANSPORT
// =============================================================================

/// Bytes requested per non-blocking read.
pub const READ_CHUNK_SIZE: usize = 4096;

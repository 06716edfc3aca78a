//! Frame header encoding and decoding for the TETHER wire format.
//!
//! Wire frame (big-endian integers):
//!
//! ```text
//! +---------+---------+---------+---------+---------+---------+
//! | version | type    | length  | sqn     | rnd     | rsv     |
//! | 2 bytes | 2 bytes | 2 bytes | 2 bytes | 6 bytes | 2 bytes |
//! +---------+---------+---------+---------+---------+---------+
//! ```
//!
//! followed by the ciphertext, a 12-byte GCM tag, and - for login frames
//! only - a 256-byte RSA-OAEP-wrapped session key.

use thiserror::Error;

use crate::core::{HEADER_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE, RANDOM_SIZE, TYPE_LOGIN};

/// Frame type identifier.
///
/// Only `LOGIN` is assigned; all other values are reserved and carried
/// opaquely rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameType(u16);

impl FrameType {
    /// Login frame (0x0000), the handshake opener.
    pub const LOGIN: Self = Self(TYPE_LOGIN);

    /// Create a frame type from a raw value.
    pub fn from_u16(value: u16) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Check whether this is a login frame.
    pub fn is_login(self) -> bool {
        self.0 == TYPE_LOGIN
    }
}

/// Frame header (unencrypted portion, used as AAD).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version (0x0100).
    pub version: u16,
    /// Frame type.
    pub frame_type: FrameType,
    /// Total frame length, including header, ciphertext, tag and - for
    /// login frames - the wrapped key. Distinct from any buffer length.
    pub frame_len: u16,
    /// Sequence number (starts at 1).
    pub sqn: u16,
    /// Random nonce-salt.
    pub random: [u8; RANDOM_SIZE],
    /// Reserved, zero on the wire.
    pub reserved: u16,
}

impl FrameHeader {
    /// Serialize the header to its 16-byte wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.version.to_be_bytes());
        buf[2..4].copy_from_slice(&self.frame_type.as_u16().to_be_bytes());
        buf[4..6].copy_from_slice(&self.frame_len.to_be_bytes());
        buf[6..8].copy_from_slice(&self.sqn.to_be_bytes());
        buf[8..14].copy_from_slice(&self.random);
        buf[14..16].copy_from_slice(&self.reserved.to_be_bytes());
        buf
    }

    /// Parse a header from the first 16 bytes of a frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::TooShort {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut random = [0u8; RANDOM_SIZE];
        random.copy_from_slice(&bytes[8..14]);

        Ok(Self {
            version: u16::from_be_bytes([bytes[0], bytes[1]]),
            frame_type: FrameType::from_u16(u16::from_be_bytes([bytes[2], bytes[3]])),
            frame_len: u16::from_be_bytes([bytes[4], bytes[5]]),
            sqn: u16::from_be_bytes([bytes[6], bytes[7]]),
            random,
            reserved: u16::from_be_bytes([bytes[14], bytes[15]]),
        })
    }
}

/// Errors that can occur during framing.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame is too short to contain the required fields.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum expected size.
        expected: usize,
        /// Actual size available.
        actual: usize,
    },

    /// Declared length does not match the frame's actual byte length.
    #[error("frame length mismatch: header declares {declared} bytes, frame is {actual}")]
    LengthMismatch {
        /// Length declared in the header.
        declared: usize,
        /// Actual frame length.
        actual: usize,
    },

    /// Declared length is smaller than an empty frame.
    #[error("declared frame length {declared} below minimum {MIN_FRAME_SIZE}")]
    InvalidLength {
        /// Length declared in the header.
        declared: usize,
    },

    /// Frame would not fit the 2-byte length field.
    #[error("frame of {len} bytes exceeds maximum {MAX_FRAME_SIZE}")]
    Oversized {
        /// Computed total frame length.
        len: usize,
    },
}

/// Peek the declared total length of the frame at the front of a buffer.
///
/// Returns `None` while the buffer does not yet cover the length field.
pub fn peek_frame_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 6 {
        return None;
    }
    Some(u16::from_be_bytes([buf[4], buf[5]]) as usize)
}

/// Split a complete frame into its header and the ciphertext-plus-tag
/// region, verifying the declared length against the actual one.
pub fn split_frame(frame: &[u8]) -> Result<(FrameHeader, &[u8]), FrameError> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            expected: MIN_FRAME_SIZE,
            actual: frame.len(),
        });
    }

    let header = FrameHeader::from_bytes(frame)?;
    let declared = header.frame_len as usize;
    if declared != frame.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: frame.len(),
        });
    }

    Ok((header, &frame[HEADER_SIZE..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PROTOCOL_VERSION;

    fn sample_header() -> FrameHeader {
        FrameHeader {
            version: PROTOCOL_VERSION,
            frame_type: FrameType::LOGIN,
            frame_len: 300,
            sqn: 7,
            random: [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF],
            reserved: 0,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_wire_layout() {
        let bytes = sample_header().to_bytes();
        assert_eq!(hex::encode(&bytes[0..2]), "0100"); // version 1.0
        assert_eq!(hex::encode(&bytes[2..4]), "0000"); // login type
        assert_eq!(hex::encode(&bytes[4..6]), "012c"); // length 300, BE
        assert_eq!(hex::encode(&bytes[6..8]), "0007"); // sqn 7, BE
        assert_eq!(hex::encode(&bytes[14..16]), "0000"); // reserved
    }

    #[test]
    fn test_header_too_short() {
        assert!(matches!(
            FrameHeader::from_bytes(&[0u8; 10]),
            Err(FrameError::TooShort { .. })
        ));
    }

    #[test]
    fn test_peek_frame_len() {
        assert_eq!(peek_frame_len(&[0u8; 5]), None);

        let bytes = sample_header().to_bytes();
        assert_eq!(peek_frame_len(&bytes), Some(300));
        assert_eq!(peek_frame_len(&bytes[..6]), Some(300));
    }

    #[test]
    fn test_split_frame_length_mismatch() {
        let mut header = sample_header();
        header.frame_len = 64;
        let mut frame = header.to_bytes().to_vec();
        frame.resize(40, 0); // actual 40, declared 64

        assert!(matches!(
            split_frame(&frame),
            Err(FrameError::LengthMismatch {
                declared: 64,
                actual: 40
            })
        ));
    }

    #[test]
    fn test_split_frame_ok() {
        let mut header = sample_header();
        header.frame_len = 40;
        let mut frame = header.to_bytes().to_vec();
        frame.resize(40, 0x5A);

        let (parsed, body) = split_frame(&frame).unwrap();
        assert_eq!(parsed.frame_len, 40);
        assert_eq!(body.len(), 40 - HEADER_SIZE);
        assert!(body.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_frame_type_reserved_values_carried() {
        let t = FrameType::from_u16(0x0455);
        assert!(!t.is_login());
        assert_eq!(t.as_u16(), 0x0455);
        assert!(FrameType::LOGIN.is_login());
    }
}

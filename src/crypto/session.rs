//! Session state and the frame codec binding.
//!
//! This module combines the cryptographic primitives into the per-connection
//! state that the driver owns:
//! - Sending and receiving encrypted frames
//! - Monotonic send/receive sequence counters
//! - Session key custody (one key per connection lifetime, no rekeying)
//!
//! Replay defense is two-layered and both layers must run: the explicit
//! sequence check rejects non-increasing counters, and the sequence number
//! embedded in the AEAD nonce makes a stale frame fail tag verification
//! even if the counter check were bypassed.

use crate::core::{
    ChannelError, CryptoError, HEADER_SIZE, MAX_FRAME_SIZE, PROTOCOL_VERSION, TAG_SIZE,
    WRAPPED_KEY_SIZE,
};
use crate::transport::frame::{split_frame, FrameError, FrameHeader, FrameType};

use super::aead::{construct_nonce, decrypt, encrypt, generate_salt, SessionKey};
use super::keywrap::{wrap_session_key, PeerPublicKey};

/// Role of this endpoint in the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The connecting side; generates and wraps the session key.
    Initiator,
    /// The accepting side; unwraps the session key.
    Responder,
}

/// Encode one wire frame.
///
/// The frame carries sequence number `send_seq + 1`; the caller persists
/// the new value once the frame is accepted for transmission. For the
/// login type the session key is additionally RSA-OAEP-wrapped under the
/// peer's public key and appended after the tag.
pub fn encode_frame(
    frame_type: FrameType,
    key: &SessionKey,
    send_seq: u16,
    plaintext: &[u8],
    peer: Option<&PeerPublicKey>,
) -> Result<Vec<u8>, ChannelError> {
    let sqn = send_seq
        .checked_add(1)
        .ok_or(CryptoError::SequenceExhausted)?;

    let mut total_len = HEADER_SIZE + plaintext.len() + TAG_SIZE;
    if frame_type.is_login() {
        total_len += WRAPPED_KEY_SIZE;
    }
    if total_len > MAX_FRAME_SIZE {
        return Err(FrameError::Oversized { len: total_len }.into());
    }

    let header = FrameHeader {
        version: PROTOCOL_VERSION,
        frame_type,
        frame_len: total_len as u16,
        sqn,
        random: generate_salt(),
        reserved: 0,
    };
    let header_bytes = header.to_bytes();

    let nonce = construct_nonce(sqn, &header.random);
    let ciphertext = encrypt(key, &nonce, &header_bytes, plaintext)?;

    let mut frame = Vec::with_capacity(total_len);
    frame.extend_from_slice(&header_bytes);
    frame.extend_from_slice(&ciphertext);

    if frame_type.is_login() {
        let peer = peer.ok_or(CryptoError::MissingPeerKey)?;
        frame.extend_from_slice(&wrap_session_key(peer, key)?);
    }

    debug_assert_eq!(frame.len(), total_len);
    Ok(frame)
}

/// Decode one wire frame.
///
/// Check order is fixed: declared length against actual length, then the
/// sequence number against the last accepted one, then AEAD verification
/// with the raw header as associated data. Returns the plaintext and the
/// sequence value to persist.
pub fn decode_frame(
    frame: &[u8],
    key: &SessionKey,
    last_recv_seq: u16,
) -> Result<(Vec<u8>, u16), ChannelError> {
    let (header, body) = split_frame(frame)?;

    if header.sqn <= last_recv_seq {
        return Err(CryptoError::ReplayOrReorder {
            last: last_recv_seq,
            got: header.sqn,
        }
        .into());
    }

    let nonce = construct_nonce(header.sqn, &header.random);
    let plaintext = decrypt(key, &nonce, &frame[..HEADER_SIZE], body)?;

    Ok((plaintext, header.sqn))
}

/// Per-connection session state.
///
/// Owned exclusively by one connection's driver; created at connection
/// open and dropped (key zeroized) at close.
pub struct SessionState {
    role: Role,
    /// Peer identity: the static RSA public key the session key is
    /// wrapped under during login.
    peer: Option<PeerPublicKey>,
    key: Option<SessionKey>,
    send_seq: u16,
    recv_seq: u16,
}

impl SessionState {
    /// Create a fresh session with no key installed.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            peer: None,
            key: None,
            send_seq: 0,
            recv_seq: 0,
        }
    }

    /// Attach the peer's static public key.
    pub fn with_peer(mut self, peer: PeerPublicKey) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Get this endpoint's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Install the session key. Called once, at handshake start.
    pub fn install_key(&mut self, key: SessionKey) {
        self.key = Some(key);
    }

    /// Whether a session key is installed.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// The session key, if installed.
    pub fn key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    /// Last sequence number sent.
    pub fn send_seq(&self) -> u16 {
        self.send_seq
    }

    /// Last sequence number accepted from the peer.
    pub fn recv_seq(&self) -> u16 {
        self.recv_seq
    }

    /// Pre-increment the send counter and return the value to embed.
    pub fn next_send_seq(&mut self) -> Result<u16, CryptoError> {
        let next = self
            .send_seq
            .checked_add(1)
            .ok_or(CryptoError::SequenceExhausted)?;
        self.send_seq = next;
        Ok(next)
    }

    /// Accept or reject an inbound sequence number.
    ///
    /// The receive counter mutates only on acceptance.
    pub fn accept_recv_seq(&mut self, candidate: u16) -> Result<(), CryptoError> {
        if candidate <= self.recv_seq {
            return Err(CryptoError::ReplayOrReorder {
                last: self.recv_seq,
                got: candidate,
            });
        }
        self.recv_seq = candidate;
        Ok(())
    }

    /// Encode an outbound frame and commit the send counter.
    pub fn seal(
        &mut self,
        frame_type: FrameType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, ChannelError> {
        let key = self.key.as_ref().ok_or(CryptoError::MissingSessionKey)?;
        let frame = encode_frame(frame_type, key, self.send_seq, plaintext, self.peer.as_ref())?;
        // encode_frame already rejected counter exhaustion
        self.send_seq += 1;
        Ok(frame)
    }

    /// Decode an inbound frame and commit the receive counter.
    pub fn open(&mut self, frame: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let key = self.key.as_ref().ok_or(CryptoError::MissingSessionKey)?;
        let (plaintext, sqn) = decode_frame(frame, key, self.recv_seq)?;
        self.accept_recv_seq(sqn)?;
        Ok(plaintext)
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("role", &self.role)
            .field("has_key", &self.key.is_some())
            .field("send_seq", &self.send_seq)
            .field("recv_seq", &self.recv_seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MIN_FRAME_SIZE, SESSION_KEY_SIZE};
    use crate::crypto::keywrap::unwrap_session_key;
    use rand::rngs::OsRng;
    use rsa::{RsaPrivateKey, RsaPublicKey};

    fn keyed_pair() -> (SessionState, SessionState) {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let mut a = SessionState::new(Role::Initiator);
        let mut b = SessionState::new(Role::Responder);
        a.install_key(key.clone());
        b.install_key(key);
        (a, b)
    }

    fn non_login_type() -> FrameType {
        FrameType::from_u16(0x0100)
    }

    #[test]
    fn test_next_send_seq_pre_increments() {
        let mut s = SessionState::new(Role::Initiator);
        assert_eq!(s.next_send_seq().unwrap(), 1);
        assert_eq!(s.next_send_seq().unwrap(), 2);
        assert_eq!(s.send_seq(), 2);
    }

    #[test]
    fn test_send_seq_exhaustion() {
        let mut s = SessionState::new(Role::Initiator);
        s.send_seq = u16::MAX;
        assert!(matches!(
            s.next_send_seq(),
            Err(CryptoError::SequenceExhausted)
        ));
        assert_eq!(s.send_seq(), u16::MAX);
    }

    #[test]
    fn test_accept_recv_seq_monotonic() {
        let mut s = SessionState::new(Role::Initiator);
        assert!(s.accept_recv_seq(1).is_ok());
        assert!(s.accept_recv_seq(5).is_ok());
        assert!(matches!(
            s.accept_recv_seq(5),
            Err(CryptoError::ReplayOrReorder { last: 5, got: 5 })
        ));
        assert!(s.accept_recv_seq(3).is_err());
        assert_eq!(s.recv_seq(), 5);
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (mut tx, mut rx) = keyed_pair();
        let payload = b"hello across the tether";

        let frame = tx.seal(non_login_type(), payload).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + payload.len() + TAG_SIZE);

        let opened = rx.open(&frame).unwrap();
        assert_eq!(opened, payload);
        assert_eq!(tx.send_seq(), 1);
        assert_eq!(rx.recv_seq(), 1);
    }

    #[test]
    fn test_stateless_codec_roundtrip() {
        let key = SessionKey::from_bytes([0x11; SESSION_KEY_SIZE]);
        let frame = encode_frame(non_login_type(), &key, 6, b"payload", None).unwrap();
        let (plaintext, sqn) = decode_frame(&frame, &key, 6).unwrap();
        assert_eq!(plaintext, b"payload");
        assert_eq!(sqn, 7);
    }

    #[test]
    fn test_every_byte_mutation_fails() {
        let (mut tx, _) = keyed_pair();
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let frame = tx.seal(non_login_type(), b"authenticated").unwrap();

        for i in 0..frame.len() {
            let mut corrupted = frame.clone();
            corrupted[i] ^= 0xFF;

            let result = decode_frame(&corrupted, &key, 0);
            match i {
                // Length field: caught by the framing check first
                4 | 5 => assert!(
                    matches!(result, Err(ChannelError::Frame(_))),
                    "byte {i}: expected framing error"
                ),
                // Everything else must fail AEAD verification (a mutated
                // sqn additionally shifts the nonce)
                _ => assert!(
                    result
                        .as_ref()
                        .err()
                        .is_some_and(ChannelError::is_authentication_failure),
                    "byte {i}: expected authentication failure, got {result:?}"
                ),
            }
        }
    }

    #[test]
    fn test_length_corruption_is_framing_not_crypto() {
        let (mut tx, _) = keyed_pair();
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let mut frame = tx.seal(non_login_type(), b"x").unwrap();
        frame[5] ^= 0x01;

        let err = decode_frame(&frame, &key, 0).unwrap_err();
        assert!(matches!(err, ChannelError::Frame(FrameError::LengthMismatch { .. })));
    }

    #[test]
    fn test_replay_rejected_despite_fresh_salt() {
        let (tx, mut rx) = keyed_pair();
        let key = tx.key().unwrap();

        // Two independently encoded frames for the same sequence slot:
        // different salts, same sqn.
        let first = encode_frame(non_login_type(), key, 0, b"one", None).unwrap();
        let second = encode_frame(non_login_type(), key, 0, b"two", None).unwrap();
        assert_ne!(first[8..14], second[8..14]);

        assert!(rx.open(&first).is_ok());
        let err = rx.open(&second).unwrap_err();
        assert!(err.is_replay_or_reorder());
    }

    #[test]
    fn test_in_order_sequence_then_replay() {
        let (mut tx, mut rx) = keyed_pair();

        let frames: Vec<Vec<u8>> = (0..5)
            .map(|i| tx.seal(non_login_type(), format!("msg {i}").as_bytes()).unwrap())
            .collect();

        for frame in &frames {
            assert!(rx.open(frame).is_ok());
        }
        assert_eq!(rx.recv_seq(), 5);

        // Resending frame #3 (sqn = 3) must be rejected
        let err = rx.open(&frames[2]).unwrap_err();
        assert!(err.is_replay_or_reorder());
        assert_eq!(rx.recv_seq(), 5);
    }

    #[test]
    fn test_open_failure_leaves_counter_untouched() {
        let (mut tx, mut rx) = keyed_pair();
        let mut frame = tx.seal(non_login_type(), b"payload").unwrap();
        frame[20] ^= 0x01;

        assert!(rx.open(&frame).is_err());
        assert_eq!(rx.recv_seq(), 0);
    }

    #[test]
    fn test_seal_without_key_fails() {
        let mut s = SessionState::new(Role::Initiator);
        assert!(matches!(
            s.seal(non_login_type(), b"x"),
            Err(ChannelError::Crypto(CryptoError::MissingSessionKey))
        ));
    }

    #[test]
    fn test_login_without_peer_key_fails() {
        let mut s = SessionState::new(Role::Initiator);
        s.install_key(SessionKey::generate());
        assert!(matches!(
            s.seal(FrameType::LOGIN, b""),
            Err(ChannelError::Crypto(CryptoError::MissingPeerKey))
        ));
    }

    #[test]
    fn test_login_frame_carries_recoverable_key() {
        let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let peer = PeerPublicKey::from_key(RsaPublicKey::from(&private)).unwrap();

        let mut s = SessionState::new(Role::Initiator).with_peer(peer);
        let key = SessionKey::generate();
        let key_bytes = *key.as_bytes();
        s.install_key(key);

        let frame = s.seal(FrameType::LOGIN, b"").unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + TAG_SIZE + WRAPPED_KEY_SIZE);

        let wrapped = &frame[frame.len() - WRAPPED_KEY_SIZE..];
        let recovered = unwrap_session_key(&private, wrapped).unwrap();
        assert_eq!(recovered.as_bytes(), &key_bytes);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let payload = vec![0u8; MAX_FRAME_SIZE]; // header + tag push it over
        let err = encode_frame(non_login_type(), &key, 0, &payload, None).unwrap_err();
        assert!(matches!(err, ChannelError::Frame(FrameError::Oversized { .. })));
    }

    #[test]
    fn test_short_frame_rejected() {
        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        let err = decode_frame(&[0u8; MIN_FRAME_SIZE - 1], &key, 0).unwrap_err();
        assert!(matches!(err, ChannelError::Frame(FrameError::TooShort { .. })));
    }
}

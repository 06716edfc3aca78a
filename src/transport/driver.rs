//! Non-blocking, readiness-driven connection driver.
//!
//! The driver owns one connection: the byte stream, the per-connection
//! [`SessionState`], the handshake engine and the inbound/outbound byte
//! buffers. It is single-threaded and cooperative - every socket
//! operation is non-blocking, and the only suspension point is waiting
//! for the next readiness notification from the external facility.
//!
//! Interest toggling follows one invariant: write interest while
//! unflushed output remains, read interest otherwise.
//!
//! Every protocol or I/O error is fatal. The driver deregisters from the
//! readiness facility, discards both buffers and reports the error to its
//! owner; corrupted frames are never retried or skipped, since skipping
//! would desynchronize the sequence counters irrecoverably.

use std::io::{self, Read, Write};

use tracing::{debug, trace, warn};

use crate::core::{ChannelError, MIN_FRAME_SIZE, READ_CHUNK_SIZE};
use crate::crypto::handshake::{HandshakeEngine, HandshakePhase};
use crate::crypto::session::SessionState;
use crate::transport::frame::{peek_frame_len, FrameError, FrameType};

/// Readiness interest registered for the connection's socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Wake the driver when the socket is readable.
    Readable,
    /// Wake the driver when the socket is writable.
    Writable,
}

/// The external readiness-notification facility, per connection.
///
/// Implementations wrap whatever reactor the embedding application runs
/// (a poll/select loop, an event library's registration handle). The
/// driver only ever holds one interest at a time.
pub trait Readiness {
    /// Register the connection's socket with the given interest.
    fn register(&mut self, interest: Interest) -> io::Result<()>;

    /// Replace the registered interest.
    fn reregister(&mut self, interest: Interest) -> io::Result<()>;

    /// Remove the socket from the facility.
    fn deregister(&mut self) -> io::Result<()>;
}

/// Event-driven driver for one secure connection.
///
/// Generic over the byte stream `S` (a non-blocking socket in production)
/// and the readiness facility `R`.
pub struct ConnectionDriver<S, R> {
    stream: S,
    readiness: R,
    session: SessionState,
    handshake: HandshakeEngine,
    recv_buf: Vec<u8>,
    send_buf: Vec<u8>,
    interest: Interest,
    open: bool,
}

impl<S: Read + Write, R: Readiness> ConnectionDriver<S, R> {
    /// Wrap a non-blocking stream, registering read interest.
    pub fn new(stream: S, mut readiness: R, session: SessionState) -> Result<Self, ChannelError> {
        readiness.register(Interest::Readable)?;
        debug!(role = ?session.role(), "connection registered");
        Ok(Self {
            stream,
            readiness,
            session,
            handshake: HandshakeEngine::new(),
            recv_buf: Vec::new(),
            send_buf: Vec::new(),
            interest: Interest::Readable,
            open: true,
        })
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The session state owned by this connection.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Current handshake phase.
    pub fn handshake_phase(&self) -> HandshakePhase {
        self.handshake.phase()
    }

    /// Bytes buffered inbound (partial frames).
    pub fn pending_input(&self) -> usize {
        self.recv_buf.len()
    }

    /// Bytes buffered outbound (unflushed frames).
    pub fn pending_output(&self) -> usize {
        self.send_buf.len()
    }

    /// Start the handshake: generate the session key and queue the login
    /// frame (wrapped key included) for transmission.
    pub fn queue_login(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        self.ensure_open()?;
        let frame = match self.handshake.initiate(&mut self.session, payload) {
            Ok(frame) => frame,
            Err(err) => return Err(self.fail(err)),
        };
        self.send_buf.extend_from_slice(&frame);
        self.handshake.mark_sent();
        self.update_interest()
    }

    /// Encrypt and queue an outbound payload.
    pub fn queue_message(
        &mut self,
        frame_type: FrameType,
        payload: &[u8],
    ) -> Result<(), ChannelError> {
        self.ensure_open()?;
        let frame = match self.session.seal(frame_type, payload) {
            Ok(frame) => frame,
            Err(err) => return Err(self.fail(err)),
        };
        self.send_buf.extend_from_slice(&frame);
        self.update_interest()
    }

    /// Handle a read-readiness notification.
    ///
    /// Performs exactly one non-blocking receive, then decodes every
    /// complete frame the inbound buffer holds. Returns the decoded
    /// payloads, in arrival order.
    pub fn handle_readable(&mut self) -> Result<Vec<Vec<u8>>, ChannelError> {
        self.ensure_open()?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(self.fail(ChannelError::PeerClosed)),
                Ok(n) => {
                    trace!(bytes = n, buffered = self.recv_buf.len() + n, "read");
                    self.recv_buf.extend_from_slice(&chunk[..n]);
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Vec::new());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(e.into())),
            }
        }

        let payloads = self.drain_frames()?;
        self.update_interest()?;
        Ok(payloads)
    }

    /// Handle a write-readiness notification.
    ///
    /// Flushes as much buffered output as the stream accepts; partial
    /// writes persist across notifications.
    pub fn handle_writable(&mut self) -> Result<(), ChannelError> {
        self.ensure_open()?;

        while !self.send_buf.is_empty() {
            match self.stream.write(&self.send_buf) {
                Ok(0) => {
                    let err = io::Error::new(io::ErrorKind::WriteZero, "stream accepted no bytes");
                    return Err(self.fail(err.into()));
                }
                Ok(n) => {
                    trace!(bytes = n, remaining = self.send_buf.len() - n, "write");
                    self.send_buf.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(e.into())),
            }
        }

        self.update_interest()
    }

    /// Dispatch a readiness notification carrying read and/or write
    /// readiness, mirroring a reactor's event mask.
    pub fn process_ready(
        &mut self,
        readable: bool,
        writable: bool,
    ) -> Result<Vec<Vec<u8>>, ChannelError> {
        let mut payloads = Vec::new();
        if readable {
            payloads = self.handle_readable()?;
        }
        if writable && self.open {
            self.handle_writable()?;
        }
        Ok(payloads)
    }

    /// Tear the connection down: deregister from the readiness facility
    /// and discard both buffers. Idempotent.
    pub fn close(&mut self) {
        if self.open {
            if let Err(e) = self.readiness.deregister() {
                warn!(error = %e, "deregister failed during teardown");
            }
            self.open = false;
            debug!("connection closed");
        }
        self.recv_buf.clear();
        self.send_buf.clear();
    }

    /// Decode every complete frame at the front of the inbound buffer.
    fn drain_frames(&mut self) -> Result<Vec<Vec<u8>>, ChannelError> {
        let mut payloads = Vec::new();

        while let Some(declared) = peek_frame_len(&self.recv_buf) {
            if declared < MIN_FRAME_SIZE {
                return Err(self.fail(FrameError::InvalidLength { declared }.into()));
            }
            if self.recv_buf.len() < declared {
                // Wait for the rest of the frame
                break;
            }

            match self.session.open(&self.recv_buf[..declared]) {
                Ok(payload) => {
                    self.handshake.on_authenticated_frame();
                    self.recv_buf.drain(..declared);
                    trace!(frame_len = declared, "frame decoded");
                    payloads.push(payload);
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        Ok(payloads)
    }

    /// Re-point the registered interest at the pending work.
    fn update_interest(&mut self) -> Result<(), ChannelError> {
        if !self.open {
            return Ok(());
        }
        let desired = if self.send_buf.is_empty() {
            Interest::Readable
        } else {
            Interest::Writable
        };
        if desired != self.interest {
            if let Err(e) = self.readiness.reregister(desired) {
                return Err(self.fail(e.into()));
            }
            self.interest = desired;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.open {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "connection is closed").into())
        }
    }

    /// Record the error, tear the connection down and hand the error back
    /// for the owner.
    fn fail(&mut self, err: ChannelError) -> ChannelError {
        warn!(error = %err, "fatal connection error");
        self.close();
        err
    }
}

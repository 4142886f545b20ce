//! The live peer connection: its socket, its two AEAD states, and the
//! one-bit congestion flag the event loop uses for backpressure.

use tokio::net::TcpStream;

use crate::codec::frame::{encode_frame, read_frame};
use crate::consts::TIMEOUT;
use crate::crypto::SessionKeys;
use crate::error::VpnError;
use crate::transport::io::{safe_write, safe_write_partial};

/// Holds everything the event loop needs to talk to one connected peer.
/// Owned exclusively by the loop and replaced atomically on accept — never
/// split between an accept path and the loop body (design note).
pub struct Session {
    pub socket: TcpStream,
    pub keys: SessionKeys,
    /// Set after a `safe_write_partial` would-block; cleared by dropping
    /// the next TUN-read packet (the spec's one-packet-drop backpressure).
    pub congested: bool,
}

impl Session {
    pub fn new(socket: TcpStream, keys: SessionKeys) -> Self {
        Self { socket, keys, congested: false }
    }

    /// Reads and decrypts exactly one frame.
    pub async fn recv_packet(&mut self) -> Result<Vec<u8>, VpnError> {
        read_frame(&mut self.socket, &mut self.keys.recv).await
    }

    /// Encrypts `packet` into one wire frame and attempts a non-blocking
    /// write of it. Returns `None` if the whole frame went out without
    /// blocking, or `Some(remaining)` — the unsent suffix of the *same*
    /// encrypted frame — if the caller should set `congested` and finish
    /// the write with `finish_send_bounded`. The frame is only encoded
    /// (and the AEAD counter only advanced) once per packet.
    pub fn try_send_packet(&mut self, packet: &mut [u8]) -> Result<Option<Vec<u8>>, VpnError> {
        let frame = encode_frame(&mut self.keys.send, packet);
        let written = safe_write_partial(&self.socket, &frame)?;
        if written == frame.len() {
            Ok(None)
        } else {
            Ok(Some(frame[written..].to_vec()))
        }
    }

    /// Finishes writing the unsent suffix of a frame already partially
    /// written by `try_send_packet`, with a bounded blocking write.
    pub async fn finish_send_bounded(&mut self, remaining: &[u8]) -> Result<(), VpnError> {
        safe_write(&mut self.socket, remaining, TIMEOUT).await
    }
}

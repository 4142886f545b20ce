//! Timed and best-effort I/O helpers over a `TcpStream`.
//!
//! Maps the spec's abstract `safe_read`/`safe_write`/`safe_write_partial`
//! contracts onto tokio: a bounded read/write uses `tokio::time::timeout`
//! wrapping the usual `AsyncReadExt`/`AsyncWriteExt` calls, and the
//! non-blocking best-effort write uses `TcpStream::try_write`, which is
//! tokio's direct analogue of a non-blocking `write()` that may return
//! `WouldBlock` without failing the connection.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::VpnError;

/// Reads exactly `buf.len()` bytes, failing if `timeout` elapses first.
pub async fn safe_read(stream: &mut TcpStream, buf: &mut [u8], timeout: Duration) -> Result<(), VpnError> {
    match tokio::time::timeout(timeout, stream.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(VpnError::Transient(format!("read failed: {}", e))),
        Err(_) => Err(VpnError::Transient("read timed out".into())),
    }
}

/// Writes all of `buf`, failing if `timeout` elapses first.
pub async fn safe_write(stream: &mut TcpStream, buf: &[u8], timeout: Duration) -> Result<(), VpnError> {
    match tokio::time::timeout(timeout, async {
        stream.write_all(buf).await?;
        stream.flush().await
    })
    .await
    {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(VpnError::Transient(format!("write failed: {}", e))),
        Err(_) => Err(VpnError::Transient("write timed out".into())),
    }
}

/// Non-blocking best-effort write of a prefix of `buf`. Returns the number
/// of bytes actually written; `0` means the socket would have blocked.
/// Never fails the connection on its own — the caller decides whether a
/// short write means "set congested" or "protocol failure".
pub fn safe_write_partial(stream: &TcpStream, buf: &[u8]) -> Result<usize, VpnError> {
    match stream.try_write(buf) {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(VpnError::Transient(format!("write failed: {}", e))),
    }
}

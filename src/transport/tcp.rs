//! Passive listener and active connector, with the socket options the
//! spec's external interfaces section calls out: `SO_REUSEADDR` on the
//! listener, `IPV6_V6ONLY` disabled so a single listener serves both
//! families, and the platform-recommended `tcp_opts` (no-delay plus
//! keepalive) on both ends.

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

use crate::error::VpnError;

const KEEPALIVE_IDLE: Duration = Duration::from_secs(60);

fn new_socket(addr: &SocketAddr) -> Result<Socket, VpnError> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| VpnError::ConfigError(format!("socket() failed: {}", e)))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| VpnError::ConfigError(format!("SO_REUSEADDR failed: {}", e)))?;
    if domain == Domain::IPV6 {
        socket
            .set_only_v6(false)
            .map_err(|e| VpnError::ConfigError(format!("IPV6_V6ONLY failed: {}", e)))?;
    }
    Ok(socket)
}

/// Binds a listening socket at `addr` with `SO_REUSEADDR` and dual-stack
/// enabled when binding an IPv6 wildcard address.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener, VpnError> {
    let socket = new_socket(&addr)?;
    socket
        .bind(&addr.into())
        .map_err(|e| VpnError::ConfigError(format!("bind({}) failed: {}", addr, e)))?;
    socket
        .listen(16)
        .map_err(|e| VpnError::ConfigError(format!("listen() failed: {}", e)))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| VpnError::ConfigError(format!("set_nonblocking failed: {}", e)))?;
    TcpListener::from_std(socket.into())
        .map_err(|e| VpnError::ConfigError(format!("tokio listener conversion failed: {}", e)))
}

/// Connects to `addr`, applying the platform-recommended `tcp_opts`.
pub async fn connect(addr: SocketAddr) -> Result<TcpStream, VpnError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| VpnError::Transient(format!("connect({}) failed: {}", addr, e)))?;
    apply_tcp_opts(&stream)?;
    Ok(stream)
}

/// Accepts one connection off an already-bound listener, applying the same
/// socket options a fresh connect would get.
pub async fn accept_one(listener: &TcpListener) -> Result<(TcpStream, SocketAddr), VpnError> {
    let (stream, peer) = listener
        .accept()
        .await
        .map_err(|e| VpnError::Transient(format!("accept failed: {}", e)))?;
    apply_tcp_opts(&stream)?;
    Ok((stream, peer))
}

/// Applies the platform-recommended `tcp_opts`: `TCP_NODELAY` for per-frame
/// latency, and a keepalive so a peer that vanishes without a clean FIN is
/// still detected instead of hanging the session open indefinitely.
///
/// `SockRef::from` borrows the stream's socket via `AsFd`/`AsRawSocket`
/// without taking ownership of the descriptor, so `set_tcp_keepalive` runs
/// against the live socket with no `unsafe` raw-fd handling.
fn apply_tcp_opts(stream: &TcpStream) -> Result<(), VpnError> {
    stream
        .set_nodelay(true)
        .map_err(|e| VpnError::Transient(format!("TCP_NODELAY failed: {}", e)))?;

    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_IDLE);
    SockRef::from(stream)
        .set_tcp_keepalive(&keepalive)
        .map_err(|e| VpnError::Transient(format!("keepalive setup failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_and_accept_apply_tcp_opts_without_error() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let connector = tokio::spawn(async move { connect(addr).await });
        let (server_stream, _) = accept_one(&listener).await.unwrap();
        let client_stream = connector.await.unwrap().unwrap();

        assert!(server_stream.nodelay().unwrap());
        assert!(client_stream.nodelay().unwrap());
    }
}

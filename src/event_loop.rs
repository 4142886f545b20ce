//! The single-threaded cooperative event loop (spec §4.5) and the
//! client's reconnection driver (§4.6).
//!
//! The spec's `poll(..., 1500ms)` wake, serviced in a fixed priority order
//! (exit flag, listener, TUN, peer), maps onto a `tokio::select!` with
//! `biased;` so branches are polled in the order written rather than
//! tokio's default random order — the closest idiomatic stand-in for "per
//! wake, in this fixed order". Every branch collapses into a
//! `LoopSignal` rather than letting an error unwind out of the loop.

use tokio::time::{interval, sleep};

use crate::config::PeerRole;
use crate::consts::{MAX_PACKET_LEN, POLL_INTERVAL};
use crate::endpoint::Endpoint;
use crate::error::{LoopSignal, VpnError};
use crate::handshake::{client_handshake, server_handshake};
use crate::session::Session;
use crate::transport::tcp;

/// Runs the endpoint until the exit flag is set or a terminal error
/// occurs, then runs the shutdown sequence (firewall unset; sockets and
/// the TUN handle close via `Drop`).
pub async fn run(endpoint: &mut Endpoint) -> Result<(), VpnError> {
    let result = drive(endpoint).await;
    endpoint.shutdown().await;
    result
}

async fn drive(endpoint: &mut Endpoint) -> Result<(), VpnError> {
    let mut wake = interval(POLL_INTERVAL);
    let mut tun_buf = vec![0u8; MAX_PACKET_LEN + 64];
    let mut terminal_error: Option<VpnError> = None;

    loop {
        if endpoint.exit_flag.is_set() {
            return Ok(());
        }

        let has_listener = endpoint.listener.is_some();
        let has_session = endpoint.session.is_some();

        let signal = tokio::select! {
            biased;

            _ = wake.tick() => LoopSignal::Continue,

            accepted = tcp::accept_one(endpoint.listener.as_ref().unwrap()), if has_listener => {
                handle_accept(endpoint, accepted).await
            }

            tun_result = crate::platform::tun::read(&mut endpoint.tun, &mut tun_buf) => {
                match tun_result {
                    Ok(n) => handle_tun_read(endpoint, tun_buf[..n].to_vec()).await,
                    Err(e) => {
                        tracing::error!("tun read failed: {}", e);
                        terminal_error = Some(e);
                        LoopSignal::Terminal
                    }
                }
            }

            peer_result = recv_from_session(&mut endpoint.session), if has_session => {
                handle_peer_read(endpoint, peer_result).await
            }
        };

        match signal {
            LoopSignal::Continue => {}
            LoopSignal::Reconnect => handle_transient(endpoint).await?,
            LoopSignal::Terminal => {
                return Err(terminal_error.expect("Terminal signal always carries its error"));
            }
        }
    }
}

async fn recv_from_session(session: &mut Option<Session>) -> Result<Vec<u8>, VpnError> {
    session.as_mut().expect("guarded by has_session").recv_packet().await
}

async fn handle_accept(
    endpoint: &mut Endpoint,
    accepted: Result<(tokio::net::TcpStream, std::net::SocketAddr), VpnError>,
) -> LoopSignal {
    let (mut stream, peer_addr) = match accepted {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!("accept failed: {}", e);
            return LoopSignal::Continue;
        }
    };

    match server_handshake(&mut stream, &endpoint.handshake_state).await {
        Ok(keys) => {
            if endpoint.session.is_some() {
                tracing::info!("replacing existing peer with new connection from {}", peer_addr);
            } else {
                tracing::info!("accepted new peer {}", peer_addr);
            }
            endpoint.session = Some(Session::new(stream, keys));
        }
        Err(e) => tracing::warn!("handshake with {} failed: {}", peer_addr, e),
    }
    LoopSignal::Continue
}

async fn handle_tun_read(endpoint: &mut Endpoint, mut packet: Vec<u8>) -> LoopSignal {
    let session = match &mut endpoint.session {
        Some(s) => s,
        None => return LoopSignal::Continue,
    };

    if session.congested {
        tracing::debug!("dropping packet while congested");
        session.congested = false;
        return LoopSignal::Continue;
    }

    match session.try_send_packet(&mut packet) {
        Ok(None) => LoopSignal::Continue,
        Ok(Some(remaining)) => {
            session.congested = true;
            match session.finish_send_bounded(&remaining).await {
                Ok(()) => LoopSignal::Continue,
                Err(e) => {
                    tracing::warn!("write to peer failed: {}", e);
                    LoopSignal::Reconnect
                }
            }
        }
        Err(e) => {
            tracing::warn!("write to peer failed: {}", e);
            LoopSignal::Reconnect
        }
    }
}

async fn handle_peer_read(endpoint: &mut Endpoint, result: Result<Vec<u8>, VpnError>) -> LoopSignal {
    match result {
        Ok(packet) => {
            if let Err(e) = crate::platform::tun::write(&mut endpoint.tun, &packet).await {
                tracing::warn!("tun write failed: {}", e);
            }
            LoopSignal::Continue
        }
        Err(e) => {
            tracing::warn!("peer connection failed: {}", e);
            LoopSignal::Reconnect
        }
    }
}

/// Tears down the current session; on the client, drives the reconnect
/// backoff loop. On the server, the listener simply remains armed.
async fn handle_transient(endpoint: &mut Endpoint) -> Result<(), VpnError> {
    endpoint.session = None;
    match endpoint.role() {
        PeerRole::Server => Ok(()),
        PeerRole::Client => reconnect(endpoint).await,
    }
}

/// Client-only reconnection policy (§4.6): retry up to
/// `RECONNECT_ATTEMPTS` times, sleeping `min(i, 3)` seconds before
/// attempt `i`. Re-checks the gateway between attempts and reinstalls
/// firewall rules if it changed. Holds no reference to the old session
/// (I5) — it was already cleared by `handle_transient` before this runs.
pub async fn reconnect(endpoint: &mut Endpoint) -> Result<(), VpnError> {
    for attempt in 0..crate::consts::RECONNECT_ATTEMPTS {
        if endpoint.exit_flag.is_set() {
            return Ok(());
        }

        let backoff = std::time::Duration::from_secs(attempt.min(3) as u64);
        if !backoff.is_zero() {
            tokio::select! {
                _ = sleep(backoff) => {}
                _ = wait_for_exit(endpoint) => return Ok(()),
            }
        }

        if let Err(e) = endpoint.refresh_gateway_if_changed() {
            tracing::warn!("gateway refresh failed: {}", e);
        }

        let addr = format!("{}:{}", endpoint.config.bind_or_server_ip, endpoint.config.port);
        let addr = match addr.parse() {
            Ok(a) => a,
            Err(e) => return Err(VpnError::ConfigError(format!("invalid server address: {}", e))),
        };

        match tcp::connect(addr).await {
            Ok(mut stream) => match client_handshake(&mut stream, &endpoint.handshake_state).await {
                Ok(keys) => {
                    tracing::info!("reconnected on attempt {}", attempt);
                    // The client's firewall rules go up only now, after the
                    // first successful handshake — there was no tunnel to
                    // protect while attempts were still failing (spec §4.6/
                    // §4.7, matching client_connect() in the reference).
                    if let Err(e) = endpoint.firewall.set(&endpoint.firewall_cmds.0) {
                        tracing::warn!("failed to install firewall rules: {}", e);
                    }
                    endpoint.session = Some(Session::new(stream, keys));
                    return Ok(());
                }
                Err(e) => tracing::warn!("handshake failed on attempt {}: {}", attempt, e),
            },
            Err(e) => tracing::warn!("connect failed on attempt {}: {}", attempt, e),
        }
    }

    Err(VpnError::Transient("exhausted reconnect attempts".into()))
}

async fn wait_for_exit(endpoint: &Endpoint) {
    while !endpoint.exit_flag.is_set() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

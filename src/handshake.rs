//! Two-message mutual-authentication handshake.
//!
//! Both sides clone the long-term `HandshakeState` fresh for each attempt
//! and run the absorb/squeeze sequence in the same order, so a failed
//! exchange never leaves derived key material behind and the final
//! squeeze (`k`) is identical on both ends.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tokio::net::TcpStream;

use crate::consts::{TIMEOUT, TS_TOLERANCE};
use crate::crypto::sponge::HandshakeState;
use crate::crypto::SessionKeys;
use crate::error::VpnError;
use crate::transport::io::{safe_read, safe_write};

const NONCE_LEN: usize = 32;
const TS_LEN: usize = 8;
const MAC_LEN: usize = 32;

/// `c_nonce[32] || ts[8] || mac[32]`
pub const CLIENT_HELLO_LEN: usize = NONCE_LEN + TS_LEN + MAC_LEN;
/// `s_nonce[32] || mac[32]`
pub const SERVER_HELLO_LEN: usize = NONCE_LEN + MAC_LEN;

/// Role byte encoded into the handshake's IV so the two peers end up with
/// swapped send/recv `CipherState`s.
pub const ROLE_SERVER: u8 = 0;
pub const ROLE_CLIENT: u8 = 1;

fn now_unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Runs the client side of the handshake over an already-connected stream.
/// Returns the derived per-direction session keys on success.
pub async fn client_handshake(stream: &mut TcpStream, base: &HandshakeState) -> Result<SessionKeys, VpnError> {
    let mut state = base.clone();

    let mut c_nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut c_nonce);
    let ts = now_unix_seconds();

    let mut msg = Vec::with_capacity(CLIENT_HELLO_LEN);
    msg.extend_from_slice(&c_nonce);
    msg.extend_from_slice(&ts.to_be_bytes());
    let mac = state.hash(&msg);
    msg.extend_from_slice(&mac);

    safe_write(stream, &msg, TIMEOUT)
        .await
        .map_err(|e| VpnError::AuthFailed(format!("sending client hello: {}", e)))?;

    let mut reply = [0u8; SERVER_HELLO_LEN];
    safe_read(stream, &mut reply, TIMEOUT)
        .await
        .map_err(|e| VpnError::AuthFailed(format!("reading server hello: {}", e)))?;

    let (s_nonce, server_mac) = reply.split_at(NONCE_LEN);
    let expected = state.hash(s_nonce);
    if expected.ct_eq(server_mac).unwrap_u8() != 1 {
        return Err(VpnError::AuthFailed("server MAC mismatch".into()));
    }

    let k = state.hash(&[]);
    Ok(SessionKeys::derive(&k, ROLE_CLIENT))
}

/// Runs the server side of the handshake over a freshly accepted stream.
/// Returns the derived per-direction session keys on success.
pub async fn server_handshake(stream: &mut TcpStream, base: &HandshakeState) -> Result<SessionKeys, VpnError> {
    let mut state = base.clone();

    let mut hello = [0u8; CLIENT_HELLO_LEN];
    safe_read(stream, &mut hello, TIMEOUT)
        .await
        .map_err(|e| VpnError::AuthFailed(format!("reading client hello: {}", e)))?;

    let (signed, client_mac) = hello.split_at(NONCE_LEN + TS_LEN);
    let expected = state.hash(signed);
    if expected.ct_eq(client_mac).unwrap_u8() != 1 {
        return Err(VpnError::AuthFailed("client MAC mismatch".into()));
    }

    let ts = u64::from_be_bytes(signed[NONCE_LEN..NONCE_LEN + TS_LEN].try_into().unwrap());
    let now = now_unix_seconds();
    let skew = now.abs_diff(ts);
    if skew > TS_TOLERANCE {
        return Err(VpnError::AuthFailed(format!(
            "handshake timestamp skew {}s exceeds tolerance",
            skew
        )));
    }

    let mut s_nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut s_nonce);
    let mac = state.hash(&s_nonce);

    let mut reply = Vec::with_capacity(SERVER_HELLO_LEN);
    reply.extend_from_slice(&s_nonce);
    reply.extend_from_slice(&mac);
    safe_write(stream, &reply, TIMEOUT)
        .await
        .map_err(|e| VpnError::AuthFailed(format!("sending server hello: {}", e)))?;

    let k = state.hash(&[]);
    Ok(SessionKeys::derive(&k, ROLE_SERVER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connector = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server_side, _) = listener.accept().await.unwrap();
        let client_side = connector.await.unwrap();
        (server_side, client_side)
    }

    #[tokio::test]
    async fn handshake_derives_identical_k_with_swapped_directions() {
        let (mut server_stream, mut client_stream) = loopback_pair().await;
        let base = HandshakeState::from_psk(&[1u8; 32]);
        let base_for_server = base.clone();

        let server_task = tokio::spawn(async move { server_handshake(&mut server_stream, &base_for_server).await });
        let client_keys = client_handshake(&mut client_stream, &base).await.unwrap();
        let server_keys = server_task.await.unwrap().unwrap();

        let mut client_send = client_keys.send;
        let mut server_recv = server_keys.recv;
        let mut buf = b"swapped directions".to_vec();
        let tag = client_send.encrypt(&mut buf);
        server_recv.decrypt(&mut buf, &tag).unwrap();
        assert_eq!(buf, b"swapped directions");
    }

    #[tokio::test]
    async fn mismatched_psk_fails_client_side() {
        let (mut server_stream, mut client_stream) = loopback_pair().await;
        let server_base = HandshakeState::from_psk(&[1u8; 32]);
        let client_base = HandshakeState::from_psk(&[2u8; 32]);

        let server_task = tokio::spawn(async move { server_handshake(&mut server_stream, &server_base).await });
        let client_result = client_handshake(&mut client_stream, &client_base).await;
        assert!(client_result.is_err());
        let _ = server_task.await;
    }
}

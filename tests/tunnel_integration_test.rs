//! End-to-end tunnel tests over a loopback TCP pair: a real handshake
//! followed by `Session::send`/`recv`, with no TUN device involved (the
//! kernel interface isn't available in CI). Covers the happy-path and
//! corruption scenarios from the spec's testable-properties section.

use duotun::crypto::HandshakeState;
use duotun::handshake::{client_handshake, server_handshake};
use duotun::session::Session;
use tokio::net::{TcpListener, TcpStream};

async fn connected_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connector = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    let (server_side, _) = listener.accept().await.unwrap();
    let client_side = connector.await.unwrap();
    (server_side, client_side)
}

async fn handshaken_sessions(psk: [u8; 32]) -> (Session, Session) {
    let (mut server_stream, mut client_stream) = connected_pair().await;
    let base = HandshakeState::from_psk(&psk);
    let server_base = base.clone();

    let server_task = tokio::spawn(async move {
        let keys = server_handshake(&mut server_stream, &server_base).await.unwrap();
        (server_stream, keys)
    });

    let client_keys = client_handshake(&mut client_stream, &base).await.unwrap();
    let (server_stream, server_keys) = server_task.await.unwrap();

    (Session::new(server_stream, server_keys), Session::new(client_stream, client_keys))
}

#[tokio::test]
async fn happy_path_carries_many_frames_intact() {
    let (mut server, mut client) = handshaken_sessions([1u8; 32]).await;

    let packet = vec![0x45u8; 84]; // minimal IPv4 header + payload, as an opaque blob
    let mut sent = packet.clone();
    assert!(client.try_send_packet(&mut sent).unwrap().is_none());
    let received = server.recv_packet().await.unwrap();
    assert_eq!(received, packet);

    for i in 0..1000u32 {
        let mut p = i.to_be_bytes().to_vec();
        assert!(client.try_send_packet(&mut p).unwrap().is_none());
        let r = server.recv_packet().await.unwrap();
        assert_eq!(r, i.to_be_bytes().to_vec());
    }
}

#[tokio::test]
async fn corrupted_tag_causes_decrypt_failure() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (mut server, mut client) = handshaken_sessions([2u8; 32]).await;

    let mut packet = b"will be corrupted".to_vec();
    let frame = duotun::codec::frame::encode_frame(&mut client.keys.send, &mut packet);

    // Flip a bit inside the tag field (bytes 2..2+TAG_LEN) and write the
    // frame directly, bypassing Session's own encode path.
    let mut corrupted = frame.clone();
    corrupted[2] ^= 0xff;
    client.socket.write_all(&corrupted).await.unwrap();
    client.socket.flush().await.unwrap();

    let result = server.recv_packet().await;
    assert!(result.is_err());

    // Drain nothing further is expected on this connection; downstream
    // behavior (reconnect) lives in the event loop, not the session.
    let mut scratch = [0u8; 1];
    let _ = tokio::time::timeout(std::time::Duration::from_millis(50), server.socket.read(&mut scratch)).await;
}

#[tokio::test]
async fn mismatched_psks_fail_handshake() {
    let (mut server_stream, mut client_stream) = connected_pair().await;
    let server_base = HandshakeState::from_psk(&[3u8; 32]);
    let client_base = HandshakeState::from_psk(&[4u8; 32]);

    let server_task = tokio::spawn(async move { server_handshake(&mut server_stream, &server_base).await });
    let client_result = client_handshake(&mut client_stream, &client_base).await;

    assert!(client_result.is_err());
    let _ = server_task.await;
}

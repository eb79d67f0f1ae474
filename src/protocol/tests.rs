// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::error::NetError;
use crate::protocol::handshake::*;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn test_handshake_flow() {
    let (mut server_side, mut client_side) = duplex(64);
    let state = ServerHandshake::new().expect("challenge");

    let client = tokio::spawn(async move { solve_challenge(&mut client_side).await });

    validate_client(&mut server_side, &state)
        .await
        .expect("client should pass");
    client.await.unwrap().expect("client should finish");
}

#[tokio::test]
async fn test_echoed_challenge_is_rejected() {
    let (mut server_side, mut client_side) = duplex(64);
    let state = ServerHandshake::with_challenge(0xABCD_EF01_2345_6789);

    // A protocol-ignorant peer that bounces the bytes back unmodified
    let client = tokio::spawn(async move {
        let challenge = client_side.read_u64_le().await.unwrap();
        client_side.write_all(&challenge.to_le_bytes()).await.unwrap();
        challenge
    });

    let result = validate_client(&mut server_side, &state).await;
    assert!(matches!(result, Err(NetError::HandshakeError(_))));
    assert_eq!(client.await.unwrap(), 0xABCD_EF01_2345_6789);
}

#[tokio::test]
async fn test_challenge_bytes_are_little_endian() {
    let (mut server_side, mut client_side) = duplex(64);
    let state = ServerHandshake::with_challenge(0x0102_0304_0506_0708);

    let server = tokio::spawn(async move { validate_client(&mut server_side, &state).await });

    let mut raw = [0u8; 8];
    client_side.read_exact(&mut raw).await.unwrap();
    assert_eq!(raw, [8, 7, 6, 5, 4, 3, 2, 1]);

    let answer = scramble(u64::from_le_bytes(raw));
    client_side.write_all(&answer.to_le_bytes()).await.unwrap();
    server.await.unwrap().expect("answer should be accepted");
}

#[tokio::test]
async fn test_peer_hangup_during_handshake() {
    let (mut server_side, client_side) = duplex(64);
    let state = ServerHandshake::new().expect("challenge");
    drop(client_side);

    let result = validate_client(&mut server_side, &state).await;
    assert!(matches!(result, Err(NetError::Io(_))));
}

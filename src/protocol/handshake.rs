//! Connection handshake.
//!
//! Before any framed traffic the server writes an 8-byte challenge, the client
//! answers with [`scramble`] of that challenge, and the server compares the
//! answer with the value it precomputed. A wrong answer closes the socket.
//!
//! This turns away clients that do not speak the protocol. It is not
//! authentication: the transform is fixed, public and reversible.
//!
//! Both values travel as little-endian `u64`s with no header.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};

use crate::error::{constants, NetError, Result};

const SCRAMBLE_IN: u64 = 0xDEAD_BEEF_C0DE_CAFE;
const SCRAMBLE_OUT: u64 = 0xC0DE_FACE_1234_5678;
// Seven bytes wide: the top byte is dropped before the final XOR.
const NIBBLE_HIGH: u64 = 0x00F0_F0F0_F0F0_F0F0;
const NIBBLE_LOW: u64 = 0x000F_0F0F_0F0F_0F0F;

/// Fixed challenge transform shared by both ends
pub fn scramble(input: u64) -> u64 {
    let out = input ^ SCRAMBLE_IN;
    let out = (out & NIBBLE_HIGH) >> 4 | (out & NIBBLE_LOW) << 4;
    out ^ SCRAMBLE_OUT
}

/// Time-seeded challenge value
pub fn generate_challenge() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .map_err(|_| NetError::HandshakeError(constants::ERR_SYSTEM_TIME.into()))
}

/// Server-side handshake state, scoped to one connection
#[derive(Debug, Clone, Copy)]
pub struct ServerHandshake {
    challenge: u64,
    expected: u64,
}

impl ServerHandshake {
    /// Fresh challenge seeded from the clock
    pub fn new() -> Result<Self> {
        Ok(Self::with_challenge(generate_challenge()?))
    }

    pub fn with_challenge(challenge: u64) -> Self {
        Self {
            challenge,
            expected: scramble(challenge),
        }
    }

    pub fn challenge(&self) -> u64 {
        self.challenge
    }

    /// Whether a client's answer solves the challenge
    pub fn verify(&self, response: u64) -> bool {
        response == self.expected
    }
}

/// Run the server half: send the challenge, read and check the answer
#[instrument(skip(stream, state), level = "debug")]
pub async fn validate_client<S>(stream: &mut S, state: &ServerHandshake) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&state.challenge().to_le_bytes()).await?;
    stream.flush().await?;

    let response = stream.read_u64_le().await?;
    if state.verify(response) {
        debug!("Client solved handshake challenge");
        Ok(())
    } else {
        warn!(response, "Client failed handshake challenge");
        Err(NetError::HandshakeError(
            constants::ERR_HANDSHAKE_MISMATCH.into(),
        ))
    }
}

/// Run the client half: read the challenge, answer with its scramble.
///
/// The client does not check anything the server sends back.
#[instrument(skip(stream), level = "debug")]
pub async fn solve_challenge<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let challenge = stream.read_u64_le().await?;
    stream.write_all(&scramble(challenge).to_le_bytes()).await?;
    stream.flush().await?;
    debug!("Answered handshake challenge");
    Ok(())
}

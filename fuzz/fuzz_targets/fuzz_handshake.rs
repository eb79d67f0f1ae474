#![no_main]

use bsl_net::protocol::handshake::{scramble, ServerHandshake};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }

    let mut challenge = [0u8; 8];
    challenge.copy_from_slice(&data[..8]);
    let mut response = [0u8; 8];
    response.copy_from_slice(&data[8..16]);

    let state = ServerHandshake::with_challenge(u64::from_le_bytes(challenge));
    let response = u64::from_le_bytes(response);
    assert_eq!(state.verify(response), response == scramble(state.challenge()));
});

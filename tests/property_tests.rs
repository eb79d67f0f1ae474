//! Property-based tests using proptest
//!
//! Framing, body access and the handshake transform checked across randomly
//! generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bsl_net::core::codec::FrameCodec;
use bsl_net::core::message::HEADER_LEN;
use bsl_net::protocol::handshake::{scramble, ServerHandshake};
use bsl_net::Message;
use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};

// Property: a decoded frame carries exactly the kind and body that were encoded
proptest! {
    #[test]
    fn prop_frame_preserves_body(kind in any::<u32>(), body in prop::collection::vec(any::<u8>(), 0..10000)) {
        let msg = Message::from_parts(kind, body.clone()).expect("fits");
        let mut codec = FrameCodec::<u32>::new();
        let mut buf = BytesMut::new();
        codec.encode(&msg, &mut buf).expect("encode");

        prop_assert_eq!(buf.len(), HEADER_LEN + body.len());
        let decoded = codec.decode(&mut buf).expect("decode").expect("complete frame");
        prop_assert_eq!(decoded.kind(), kind);
        prop_assert_eq!(decoded.body(), &body[..]);
        prop_assert!(buf.is_empty());
    }
}

// Property: frames split at arbitrary points decode to the same messages, in order
proptest! {
    #[test]
    fn prop_chunked_stream_decodes_in_order(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..20),
        chunk in 1usize..64,
    ) {
        let mut codec = FrameCodec::<u32>::new();
        let mut wire = BytesMut::new();
        for (seq, body) in bodies.iter().enumerate() {
            let msg = Message::from_parts(seq as u32, body.clone()).expect("fits");
            codec.encode(msg, &mut wire).expect("encode");
        }

        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(msg) = codec.decode(&mut buf).expect("decode") {
                decoded.push(msg);
            }
        }

        prop_assert_eq!(decoded.len(), bodies.len());
        for (seq, (msg, body)) in decoded.iter().zip(&bodies).enumerate() {
            prop_assert_eq!(msg.kind(), seq as u32);
            prop_assert_eq!(msg.body(), &body[..]);
        }
    }
}

// Property: values come back out of a body in reverse push order
proptest! {
    #[test]
    fn prop_push_pop_is_last_in_first_out(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let mut msg = Message::new(0u32);
        for value in &values {
            msg.push(value);
        }
        prop_assert_eq!(msg.size(), values.len() * 4);
        prop_assert_eq!(msg.header().size as usize, msg.size());

        for expected in values.iter().rev() {
            prop_assert_eq!(msg.pop::<u32>().expect("value present"), *expected);
        }
        prop_assert_eq!(msg.size(), 0);
        prop_assert!(msg.pop::<u8>().is_err());
    }
}

// Property: mixed-width values keep their order and bit patterns
proptest! {
    #[test]
    fn prop_mixed_values(a in any::<u8>(), b in any::<i64>(), c in any::<f64>(), d in any::<u16>()) {
        let mut msg = Message::new(1u32);
        msg.push(&a).push(&b).push(&c).push(&d);
        prop_assert_eq!(msg.size(), 1 + 8 + 8 + 2);

        prop_assert_eq!(msg.pop::<u16>().expect("d"), d);
        prop_assert_eq!(msg.pop::<f64>().expect("c").to_bits(), c.to_bits());
        prop_assert_eq!(msg.pop::<i64>().expect("b"), b);
        prop_assert_eq!(msg.pop::<u8>().expect("a"), a);
    }
}

// Property: only the scrambled challenge passes verification
proptest! {
    #[test]
    fn prop_handshake_accepts_only_scramble(challenge in any::<u64>(), noise in 1u64..) {
        let state = ServerHandshake::with_challenge(challenge);
        prop_assert!(state.verify(scramble(challenge)));
        prop_assert!(!state.verify(scramble(challenge) ^ noise));
    }
}

// Property: a header claiming more than the limit is refused however much body follows
proptest! {
    #[test]
    fn prop_oversized_header_rejected(limit in 1usize..4096, excess in 1u32..1000, trailing in 0usize..64) {
        let mut codec = FrameCodec::<u32>::with_max_frame_size(limit);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&(limit as u32 + excess).to_le_bytes());
        buf.extend_from_slice(&vec![0u8; trailing]);

        prop_assert!(codec.decode(&mut buf).is_err());
    }
}

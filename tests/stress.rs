#![allow(clippy::unwrap_used)]

mod common;

use bsl_net::core::codec::FrameCodec;
use bsl_net::Message;
use bytes::BytesMut;
use common::*;
use tokio_util::codec::{Decoder, Encoder};

#[test]
fn stress_frame_encode_decode_large_series() {
    // Heavy burst of frames, no panics and nothing left behind in the buffer
    let mut codec = FrameCodec::<u32>::new();
    let mut buf = BytesMut::new();

    for size in [0usize, 1, 64, 512, 4096, 65536, 1_048_576] {
        for _ in 0..200 {
            let msg = Message::from_parts(3u32, vec![0u8; size]).unwrap();
            codec.encode(msg, &mut buf).unwrap();
            let decoded = codec.decode(&mut buf).unwrap();
            assert_eq!(decoded.map(|m| m.size()), Some(size));
            assert!(buf.is_empty());
        }
    }
}

#[test]
fn stress_large_bodies_over_loopback() {
    let recorder = Recorder::echoing();
    let events = recorder.events.clone();
    let (server, port) = start_server(recorder, local_config());
    let client = connect_client(port);

    let sizes = [0usize, 1, 4096, 1 << 20, 4 << 20];
    for (seq, size) in sizes.iter().enumerate() {
        let body: Vec<u8> = (0..*size).map(|i| (i % 251) as u8).collect();
        client
            .send(Message::from_parts(seq as u32, body).unwrap())
            .unwrap();
    }

    assert!(pump_until(&server, &events, sizes.len()));
    let echoed = collect_client(&client, sizes.len());
    assert_eq!(echoed.len(), sizes.len());
    for (seq, (msg, size)) in echoed.iter().zip(sizes).enumerate() {
        assert_eq!(msg.kind(), seq as u32);
        assert_eq!(msg.size(), size);
        assert!(msg.body().iter().enumerate().all(|(i, b)| *b == (i % 251) as u8));
    }
}

#[test]
fn stress_broadcast_fan_out() {
    const CLIENTS: usize = 8;
    const ROUNDS: u32 = 250;

    let (server, port) = start_server(Recorder::new(), local_config());
    let clients: Vec<_> = (0..CLIENTS).map(|_| connect_client(port)).collect();
    assert!(eventually(WAIT, || server.handle().validated_ids().len() == CLIENTS));

    for round in 0..ROUNDS {
        let mut msg = Message::new(1u32);
        msg.push(&round);
        assert_eq!(server.message_all_clients(&msg, None), CLIENTS);
    }

    for client in &clients {
        let received = collect_client(client, ROUNDS as usize);
        let rounds: Vec<u32> = received
            .into_iter()
            .map(|mut msg| msg.pop::<u32>().unwrap())
            .collect();
        assert_eq!(rounds, (0..ROUNDS).collect::<Vec<_>>());
    }
}

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bsl_net::core::codec::FrameCodec;
use bsl_net::{Client, Message, TsQueue};
use bytes::BytesMut;
use common::*;
use tokio_util::codec::{Decoder, Encoder};

#[test]
fn concurrent_producers_single_consumer() {
    const PRODUCERS: u32 = 8;
    const PER_PRODUCER: u32 = 10_000;

    let queue = Arc::new(TsQueue::<(u32, u32)>::new());

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let mut last_seen = vec![None::<u32>; PRODUCERS as usize];
            let mut received = 0u32;
            while received < PRODUCERS * PER_PRODUCER {
                queue.wait();
                while let Some((producer, seq)) = queue.pop_front() {
                    let slot = &mut last_seen[producer as usize];
                    assert!(slot.map_or(true, |last| seq > last));
                    *slot = Some(seq);
                    received += 1;
                }
            }
            received
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    queue.push_back((producer, seq));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(consumer.join().unwrap(), PRODUCERS * PER_PRODUCER);
    assert!(queue.is_empty());
}

#[test]
fn wait_timeout_wakes_on_push() {
    let queue = Arc::new(TsQueue::new());
    let pusher = {
        let queue = queue.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            queue.push_front(1u8);
        })
    };

    assert!(queue.wait_timeout(Duration::from_secs(5)));
    assert_eq!(queue.pop_back(), Some(1));
    pusher.join().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    use tokio::task::JoinSet;

    let iterations = 5_000usize;
    let body_sizes = [0usize, 64, 512, 4096, 65536];

    let mut tasks = JoinSet::new();
    for &size in &body_sizes {
        tasks.spawn(async move {
            let mut codec = FrameCodec::<u32>::new();
            let mut buf = BytesMut::new();
            for i in 0..iterations {
                let body = vec![((i + size) & 0xFF) as u8; size];
                let msg = Message::from_parts(i as u32, body).unwrap();
                codec.encode(&msg, &mut buf).unwrap();
                let decoded = codec.decode(&mut buf).unwrap();
                assert_eq!(decoded.as_ref(), Some(&msg));
                assert!(buf.is_empty());
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}

#[test]
fn many_clients_send_concurrently() {
    const CLIENTS: usize = 4;
    const PER_CLIENT: u32 = 1_000;

    let recorder = Recorder::new();
    let events = recorder.events.clone();
    let (server, port) = start_server(recorder, local_config());
    let clients: Vec<Client<u32>> = (0..CLIENTS).map(|_| connect_client(port)).collect();

    thread::scope(|scope| {
        for client in &clients {
            scope.spawn(move || {
                for seq in 0..PER_CLIENT {
                    let mut msg = Message::new(1u32);
                    msg.push(&seq);
                    client.send(msg).unwrap();
                }
            });
        }
    });

    assert!(pump_until(&server, &events, CLIENTS * PER_CLIENT as usize));

    let messages = events.messages.lock();
    let mut per_client = std::collections::BTreeMap::<u32, Vec<u32>>::new();
    for (client_id, msg) in messages.iter() {
        per_client
            .entry(*client_id)
            .or_default()
            .push(msg.clone().pop::<u32>().unwrap());
    }
    assert_eq!(per_client.len(), CLIENTS);
    for seqs in per_client.values() {
        assert_eq!(*seqs, (0..PER_CLIENT).collect::<Vec<_>>());
    }
}

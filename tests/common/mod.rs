//! Helpers shared by the endpoint integration tests

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bsl_net::config::NetworkConfig;
use bsl_net::{Client, Message, Server, ServerHandle, ServerHandler};
use parking_lot::Mutex;

pub const WAIT: Duration = Duration::from_secs(5);

/// Poll `cond` every 5ms until it holds or `timeout` passes
pub fn eventually<F: FnMut() -> bool>(timeout: Duration, mut cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Loopback server config with short timeouts
pub fn local_config() -> NetworkConfig {
    NetworkConfig::default_with_overrides(|config| {
        config.server.host = "127.0.0.1".to_string();
        config.server.handshake_timeout = Duration::from_millis(500);
        config.server.shutdown_timeout = Duration::from_secs(2);
        config.client.connect_timeout = Duration::from_secs(2);
        config.client.handshake_timeout = Duration::from_secs(2);
    })
}

/// What a [`Recorder`] has seen
#[derive(Default)]
pub struct Events {
    pub messages: Mutex<Vec<(u32, Message<u32>)>>,
    pub validated: Mutex<Vec<u32>>,
    pub disconnected: Mutex<Vec<u32>>,
}

/// Handler that records every callback and optionally echoes messages back
#[derive(Clone)]
pub struct Recorder {
    pub events: Arc<Events>,
    pub echo: bool,
    pub accept: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Events::default()),
            echo: false,
            accept: true,
        }
    }

    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    pub fn refusing() -> Self {
        Self {
            accept: false,
            ..Self::new()
        }
    }
}

impl ServerHandler<u32> for Recorder {
    fn on_client_connect(&self, _peer: SocketAddr) -> bool {
        self.accept
    }

    fn on_client_validated(&self, _server: &ServerHandle<u32>, client_id: u32) {
        self.events.validated.lock().push(client_id);
    }

    fn on_client_disconnect(&self, _server: &ServerHandle<u32>, client_id: u32) {
        self.events.disconnected.lock().push(client_id);
    }

    fn on_message(&self, server: &ServerHandle<u32>, client_id: u32, msg: Message<u32>) {
        if self.echo {
            server.message_client(client_id, msg.clone());
        }
        self.events.messages.lock().push((client_id, msg));
    }
}

/// Start a recording server on an ephemeral loopback port
pub fn start_server(recorder: Recorder, config: NetworkConfig) -> (Server<u32>, u16) {
    let mut server = Server::with_config(recorder, config).expect("server");
    let addr = server.start(0).expect("start");
    (server, addr.port())
}

pub fn connect_client(port: u16) -> Client<u32> {
    let mut client = Client::with_config(local_config()).expect("client");
    client.connect("127.0.0.1", port).expect("connect");
    client
}

/// Dispatch queued server messages until `count` have been recorded
pub fn pump_until(server: &Server<u32>, events: &Events, count: usize) -> bool {
    eventually(WAIT, || {
        server.update(usize::MAX, false);
        events.messages.lock().len() >= count
    })
}

/// Pop messages off a client's inbound queue until `count` have arrived
pub fn collect_client(client: &Client<u32>, count: usize) -> Vec<Message<u32>> {
    let mut received = Vec::new();
    eventually(WAIT, || {
        while let Some(owned) = client.incoming().pop_front() {
            assert_eq!(owned.remote, None);
            received.push(owned.msg);
        }
        received.len() >= count
    });
    received
}

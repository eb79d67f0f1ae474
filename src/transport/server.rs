//! # Server Endpoint
//!
//! Accepts sockets, validates each peer, and hands their messages to the
//! application through one shared inbound queue.
//!
//! The server owns a multi-threaded tokio runtime that drives every socket.
//! The application calls [`Server::update`] from its own thread, once per tick
//! or in a loop, to drain the inbound queue into [`ServerHandler::on_message`].
//!
//! Connections are addressed by the integer ID assigned at accept time.
//! [`ServerHandle`] is the cloneable façade for sending to and dropping
//! connections by ID; it is what every callback receives.
//!
//! ## Callback threads
//! - `on_client_connect`, `on_client_validated`: I/O worker thread
//! - `on_client_disconnect`: whichever thread noticed the disconnect
//! - `on_message`: the thread calling [`Server::update`]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{NetworkConfig, ServerConfig, TransportConfig};
use crate::core::message::{Message, MessageKind, OwnedMessage};
use crate::core::tsqueue::TsQueue;
use crate::error::{constants, NetError, Result};
use crate::transport::connection::{Connection, ConnectionHandle, Owner};
use crate::utils::metrics::global_metrics;

/// Application hooks for a [`Server`]
pub trait ServerHandler<T: MessageKind>: Send + Sync + 'static {
    /// Accept policy, consulted before the handshake. Returning `false` drops
    /// the socket.
    fn on_client_connect(&self, _peer: SocketAddr) -> bool {
        true
    }

    /// The client answered the challenge correctly
    fn on_client_validated(&self, _server: &ServerHandle<T>, _client_id: u32) {}

    /// The connection is gone and its ID has left the roster.
    ///
    /// Called once per admitted connection, including ones that failed the
    /// handshake.
    fn on_client_disconnect(&self, _server: &ServerHandle<T>, _client_id: u32) {}

    /// A message arrived from `client_id`
    fn on_message(&self, server: &ServerHandle<T>, client_id: u32, msg: Message<T>);
}

struct Shared<T: MessageKind> {
    roster: RwLock<BTreeMap<u32, ConnectionHandle<T>>>,
    inbound: Arc<TsQueue<OwnedMessage<T>>>,
    handler: Arc<dyn ServerHandler<T>>,
    next_id: AtomicU32,
    live_tasks: AtomicUsize,
    config: ServerConfig,
    transport: TransportConfig,
}

/// Cloneable access to a running server's connections
pub struct ServerHandle<T: MessageKind> {
    shared: Arc<Shared<T>>,
}

impl<T: MessageKind> Clone for ServerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: MessageKind> ServerHandle<T> {
    /// Queue a message for one client.
    ///
    /// Returns `false` if the client is unknown or already disconnected; a
    /// disconnected client is removed and `on_client_disconnect` fires.
    pub fn message_client(&self, client_id: u32, msg: Message<T>) -> bool {
        let handle = self.shared.roster.read().get(&client_id).cloned();
        let Some(handle) = handle else {
            debug!(client_id, "Message for unknown client dropped");
            return false;
        };

        if handle.is_connected() && handle.send(msg).is_ok() {
            true
        } else {
            self.remove_client(client_id);
            false
        }
    }

    /// Queue a message for every validated client except `exclude`.
    ///
    /// Clients found disconnected during the sweep are removed. Returns the
    /// number of clients the message was queued for.
    pub fn message_all_clients(&self, msg: &Message<T>, exclude: Option<u32>) -> usize {
        let handles: Vec<ConnectionHandle<T>> =
            self.shared.roster.read().values().cloned().collect();

        let mut queued = 0;
        let mut dead = Vec::new();
        for handle in handles {
            if !handle.is_connected() {
                dead.push(handle.id());
                continue;
            }
            if Some(handle.id()) == exclude || !handle.is_validated() {
                continue;
            }
            match handle.send(msg.clone()) {
                Ok(()) => queued += 1,
                Err(_) => dead.push(handle.id()),
            }
        }

        for client_id in dead {
            self.remove_client(client_id);
        }
        queued
    }

    /// Close a client's connection after its in-flight frame
    pub fn disconnect_client(&self, client_id: u32) -> bool {
        self.remove_client(client_id)
    }

    /// IDs of every connection in the roster, validated or not
    pub fn client_ids(&self) -> Vec<u32> {
        self.shared.roster.read().keys().copied().collect()
    }

    /// IDs of connections that passed the handshake and are still open
    pub fn validated_ids(&self) -> Vec<u32> {
        self.shared
            .roster
            .read()
            .values()
            .filter(|handle| handle.is_validated())
            .map(|handle| handle.id())
            .collect()
    }

    pub fn client_count(&self) -> usize {
        self.shared.roster.read().len()
    }

    pub fn is_client_connected(&self, client_id: u32) -> bool {
        self.shared
            .roster
            .read()
            .get(&client_id)
            .is_some_and(|handle| handle.is_connected())
    }

    /// Take a connection out of the roster and tell the application.
    ///
    /// Only the caller that actually removes the entry fires the callback.
    fn remove_client(&self, client_id: u32) -> bool {
        let removed = self.shared.roster.write().remove(&client_id);
        let Some(handle) = removed else {
            return false;
        };

        handle.disconnect();
        global_metrics().connection_closed();
        info!(client_id, peer = %handle.peer(), "Removing client");
        self.shared.handler.on_client_disconnect(self, client_id);
        true
    }

    /// Accept policy, ID assignment and the connection task
    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let shared = &self.shared;

        if shared.roster.read().len() >= shared.config.max_connections {
            global_metrics().connection_rejected();
            warn!(
                peer = %peer,
                max_connections = shared.config.max_connections,
                "Connection limit reached, rejecting"
            );
            return;
        }

        if !shared.handler.on_client_connect(peer) {
            global_metrics().connection_rejected();
            info!(peer = %peer, "Connection denied");
            return;
        }

        let client_id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (mut connection, handle) = match Connection::new(
            Owner::Server,
            client_id,
            stream,
            shared.inbound.clone(),
            &shared.transport,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Failed to set up connection");
                return;
            }
        };

        shared.roster.write().insert(client_id, handle);
        global_metrics().connection_established();
        info!(client_id, peer = %peer, "Connection approved");

        let server = self.clone();
        let handshake_timeout = shared.config.handshake_timeout;
        shared.live_tasks.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(async move {
            match connection.validate_client(handshake_timeout).await {
                Ok(()) => {
                    server.shared.handler.on_client_validated(&server, client_id);
                    connection.run().await;
                }
                Err(_) => drop(connection),
            }
            server.remove_client(client_id);
            server.shared.live_tasks.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

async fn accept_loop<T: MessageKind>(
    listener: TcpListener,
    server: ServerHandle<T>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Server stopped accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => server.admit(stream, peer),
                Err(e) => error!(error = %e, "Error accepting connection"),
            },
        }
    }
}

/// TCP server endpoint
///
/// Owns its own tokio runtime and blocks on it in [`start`](Self::start),
/// [`stop`](Self::stop) and on drop. It must not be used or dropped from
/// within an async context; doing so panics.
pub struct Server<T: MessageKind> {
    runtime: Runtime,
    handle: ServerHandle<T>,
    shutdown: CancellationToken,
    acceptor: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl<T: MessageKind> Server<T> {
    /// Create a server with the default configuration
    pub fn new<H: ServerHandler<T>>(handler: H) -> Result<Self> {
        Self::with_config(handler, NetworkConfig::default())
    }

    /// Create a server; nothing is bound until [`start`](Self::start)
    pub fn with_config<H: ServerHandler<T>>(handler: H, config: NetworkConfig) -> Result<Self> {
        config.validate_strict()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.server.worker_threads)
            .thread_name("bsl-net-server")
            .enable_all()
            .build()
            .map_err(|e| NetError::ConfigError(format!("{}: {e}", constants::ERR_RUNTIME_BUILD)))?;

        let shared = Shared {
            roster: RwLock::new(BTreeMap::new()),
            inbound: Arc::new(TsQueue::new()),
            handler: Arc::new(handler),
            next_id: AtomicU32::new(config.server.first_client_id),
            live_tasks: AtomicUsize::new(0),
            config: config.server,
            transport: config.transport,
        };

        Ok(Self {
            runtime,
            handle: ServerHandle {
                shared: Arc::new(shared),
            },
            shutdown: CancellationToken::new(),
            acceptor: None,
            local_addr: None,
        })
    }

    /// Bind `host:port` and start accepting. Port 0 picks a free port.
    #[instrument(skip(self))]
    pub fn start(&mut self, port: u16) -> Result<SocketAddr> {
        if self.local_addr.is_some() {
            return Err(NetError::AlreadyStarted);
        }

        let host = self.handle.shared.config.host.clone();
        let listener = self
            .runtime
            .block_on(TcpListener::bind((host.as_str(), port)))?;
        let addr = listener.local_addr()?;

        self.shutdown = CancellationToken::new();
        self.acceptor = Some(self.runtime.spawn(accept_loop(
            listener,
            self.handle.clone(),
            self.shutdown.clone(),
        )));

        info!(address = %addr, "Server started");
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Stop accepting, close every connection, and wait up to the configured
    /// shutdown timeout for connection tasks to unwind.
    pub fn stop(&mut self) {
        if self.local_addr.take().is_none() {
            return;
        }

        info!("Shutting down server. Waiting for connections to close...");
        self.shutdown.cancel();

        let acceptor = self.acceptor.take();
        let handle = self.handle.clone();
        let unwound = async move {
            if let Some(acceptor) = acceptor {
                if let Err(e) = acceptor.await {
                    warn!(error = %e, "Accept loop ended abnormally");
                }
            }
            for client_id in handle.client_ids() {
                handle.remove_client(client_id);
            }
            while handle.shared.live_tasks.load(Ordering::Acquire) > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        let timeout = self.handle.shared.config.shutdown_timeout;
        if self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, unwound).await })
            .is_err()
        {
            warn!("Shutdown timeout reached, forcing exit");
        }
        global_metrics().log_metrics();
        info!("Server stopped");
    }

    /// Dispatch up to `max_messages` queued messages to
    /// [`ServerHandler::on_message`].
    ///
    /// With `wait`, first blocks until at least one message is queued.
    /// Returns the number of messages dispatched.
    pub fn update(&self, max_messages: usize, wait: bool) -> usize {
        let inbound = &self.handle.shared.inbound;
        if wait {
            inbound.wait();
        }

        let mut processed = 0;
        while processed < max_messages {
            let Some(owned) = inbound.pop_front() else {
                break;
            };
            let client_id = owned.remote.unwrap_or_default();
            self.handle
                .shared
                .handler
                .on_message(&self.handle, client_id, owned.msg);
            processed += 1;
        }
        processed
    }

    /// Access for sending from outside the callbacks
    pub fn handle(&self) -> ServerHandle<T> {
        self.handle.clone()
    }

    /// The shared inbound queue `update` drains
    pub fn incoming(&self) -> &TsQueue<OwnedMessage<T>> {
        &self.handle.shared.inbound
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.local_addr.is_some()
    }

    /// See [`ServerHandle::message_client`]
    pub fn message_client(&self, client_id: u32, msg: Message<T>) -> bool {
        self.handle.message_client(client_id, msg)
    }

    /// See [`ServerHandle::message_all_clients`]
    pub fn message_all_clients(&self, msg: &Message<T>, exclude: Option<u32>) -> usize {
        self.handle.message_all_clients(msg, exclude)
    }
}

impl<T: MessageKind> Drop for Server<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

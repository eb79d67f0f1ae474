//! Client endpoint: one connection to one server.
//!
//! The client owns a small tokio runtime for its socket. Received messages
//! land in [`Client::incoming`] with `remote` set to `None`; the application
//! drains that queue on its own thread.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tracing::{info, instrument};

use crate::config::{ClientConfig, NetworkConfig, TransportConfig};
use crate::core::message::{Message, MessageKind, OwnedMessage};
use crate::core::tsqueue::TsQueue;
use crate::error::{constants, NetError, Result};
use crate::transport::connection::{Connection, ConnectionHandle, ConnectionState, Owner};
use crate::utils::timeout::with_timeout_error;

/// TCP client endpoint
///
/// Owns its own tokio runtime and blocks on it in [`connect`](Self::connect).
/// It must not be used or dropped from within an async context; doing so
/// panics.
pub struct Client<T: MessageKind> {
    runtime: Runtime,
    config: ClientConfig,
    transport: TransportConfig,
    inbound: Arc<TsQueue<OwnedMessage<T>>>,
    connection: Option<ConnectionHandle<T>>,
}

impl<T: MessageKind> Client<T> {
    pub fn new() -> Result<Self> {
        Self::with_config(NetworkConfig::default())
    }

    pub fn with_config(config: NetworkConfig) -> Result<Self> {
        config.validate_strict()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.client.worker_threads)
            .thread_name("bsl-net-client")
            .enable_all()
            .build()
            .map_err(|e| NetError::ConfigError(format!("{}: {e}", constants::ERR_RUNTIME_BUILD)))?;

        Ok(Self {
            runtime,
            config: config.client,
            transport: config.transport,
            inbound: Arc::new(TsQueue::new()),
            connection: None,
        })
    }

    /// Resolve `host`, connect, and start answering the server's challenge.
    ///
    /// Returns once the TCP connection is up; the handshake finishes in the
    /// background and messages sent meanwhile are written right after it.
    /// An existing connection is closed first.
    #[instrument(skip(self))]
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.disconnect();

        let stream = self.runtime.block_on(with_timeout_error(
            async { TcpStream::connect((host, port)).await.map_err(NetError::from) },
            self.config.connect_timeout,
        ))?;

        let (mut connection, handle) = Connection::new(
            Owner::Client,
            0,
            stream,
            self.inbound.clone(),
            &self.transport,
        )?;

        let handshake_timeout = self.config.handshake_timeout;
        self.runtime.spawn(async move {
            if connection.solve_puzzle(handshake_timeout).await.is_ok() {
                connection.run().await;
            }
        });

        info!(peer = %handle.peer(), "Connected to server");
        self.connection = Some(handle);
        Ok(())
    }

    /// Close the connection after the frame being written, if any.
    /// Queued messages not yet started are dropped.
    pub fn disconnect(&mut self) {
        if let Some(handle) = self.connection.take() {
            handle.disconnect();
            info!(peer = %handle.peer(), "Disconnected from server");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|handle| handle.is_connected())
    }

    /// Lifecycle state of the current connection, if any
    pub fn state(&self) -> Option<ConnectionState> {
        self.connection.as_ref().map(|handle| handle.state())
    }

    /// Queue a message for the server
    pub fn send(&self, msg: Message<T>) -> Result<()> {
        match &self.connection {
            Some(handle) => handle.send(msg),
            None => Err(NetError::NotConnected),
        }
    }

    /// Messages received from the server
    pub fn incoming(&self) -> &TsQueue<OwnedMessage<T>> {
        &self.inbound
    }
}

impl<T: MessageKind> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

//! # Connections
//!
//! One TCP socket, its handshake, and the read/write loops that move frames
//! between the socket and the endpoint's queues.
//!
//! A connection is split in two:
//! - [`Connection`] owns the socket, the receiving end of the outbound queue
//!   and the shared inbound queue. It is consumed by a single task.
//! - [`ConnectionHandle`] is the cheap, cloneable control side: queue a
//!   message, ask the task to close, read the state. Holding a handle does not
//!   keep the socket open.
//!
//! ## Lifecycle
//! ```text
//! server: Created -> AwaitingValidation -> Validated -> Closed
//! client: Created -> SolvingPuzzle      -> Validated -> Closed
//! ```
//!
//! ## Write path
//! Messages are written whole, one after another, in the order they were
//! queued. A shutdown request is only honoured between frames, so a graceful
//! close never leaves a partial frame on the wire. A socket error mid-write
//! can.
//!
//! ## Read path
//! Header first, then exactly `size` body bytes, then the complete message is
//! pushed on the inbound queue and the next header read starts. A read error,
//! an oversized frame or an unknown kind ends the loop and closes the socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::core::codec::FrameCodec;
use crate::core::message::{Message, MessageKind, OwnedMessage};
use crate::core::tsqueue::TsQueue;
use crate::error::{NetError, Result};
use crate::protocol::handshake::{self, ServerHandshake};
use crate::utils::metrics::{global_metrics, Timer};
use crate::utils::timeout::with_timeout_error;

/// Which half of the protocol a connection plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Accepted by a server, talks to a client
    Server,
    /// Opened by a client, talks to a server
    Client,
}

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Created = 0,
    AwaitingValidation = 1,
    SolvingPuzzle = 2,
    Validated = 3,
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Created,
            1 => ConnectionState::AwaitingValidation,
            2 => ConnectionState::SolvingPuzzle,
            3 => ConnectionState::Validated,
            _ => ConnectionState::Closed,
        }
    }
}

#[derive(Debug)]
struct SharedState(AtomicU8);

impl SharedState {
    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Control side of a connection
#[derive(Debug)]
pub struct ConnectionHandle<T> {
    id: u32,
    owner: Owner,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Message<T>>,
    shutdown: CancellationToken,
    state: Arc<SharedState>,
}

impl<T> Clone for ConnectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner,
            peer: self.peer,
            outbound: self.outbound.clone(),
            shutdown: self.shutdown.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: MessageKind> ConnectionHandle<T> {
    /// Server-assigned ID; always 0 on the client side
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether the socket is still open and the task still running
    pub fn is_connected(&self) -> bool {
        self.state() != ConnectionState::Closed && !self.outbound.is_closed()
    }

    pub fn is_validated(&self) -> bool {
        self.state() == ConnectionState::Validated && !self.outbound.is_closed()
    }

    /// Queue a message for writing; returns immediately.
    ///
    /// Messages queued before the handshake completes are written right after it.
    pub fn send(&self, msg: Message<T>) -> Result<()> {
        if self.state() == ConnectionState::Closed {
            return Err(NetError::ConnectionClosed);
        }
        self.outbound
            .send(msg)
            .map_err(|_| NetError::ConnectionClosed)
    }

    /// Ask the connection task to close after the frame it is writing
    pub fn disconnect(&self) {
        self.shutdown.cancel();
    }
}

/// Task-owned side of a connection
pub struct Connection<T> {
    id: u32,
    owner: Owner,
    peer: SocketAddr,
    stream: TcpStream,
    inbound: Arc<TsQueue<OwnedMessage<T>>>,
    outbound: mpsc::UnboundedReceiver<Message<T>>,
    shutdown: CancellationToken,
    state: Arc<SharedState>,
    codec: FrameCodec<T>,
}

impl<T: MessageKind> Connection<T> {
    /// Wrap a connected socket, returning the task side and a control handle
    pub fn new(
        owner: Owner,
        id: u32,
        stream: TcpStream,
        inbound: Arc<TsQueue<OwnedMessage<T>>>,
        transport: &TransportConfig,
    ) -> Result<(Self, ConnectionHandle<T>)> {
        let peer = stream.peer_addr()?;
        if transport.nodelay {
            stream.set_nodelay(true)?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let state = Arc::new(SharedState(AtomicU8::new(ConnectionState::Created as u8)));

        let handle = ConnectionHandle {
            id,
            owner,
            peer,
            outbound: tx,
            shutdown: shutdown.clone(),
            state: state.clone(),
        };
        let connection = Self {
            id,
            owner,
            peer,
            stream,
            inbound,
            outbound: rx,
            shutdown,
            state,
            codec: FrameCodec::with_max_frame_size(transport.max_frame_size),
        };
        Ok((connection, handle))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Server side: challenge the client and check its answer.
    ///
    /// On failure the state becomes `Closed`; dropping the connection closes
    /// the socket.
    pub async fn validate_client(&mut self, timeout: Duration) -> Result<()> {
        self.state.set(ConnectionState::AwaitingValidation);
        global_metrics().handshake_attempt();
        let _timer = Timer::start("validate_client");

        let state = ServerHandshake::new()?;
        let stream = &mut self.stream;
        let exchange = with_timeout_error(handshake::validate_client(stream, &state), timeout);

        let result = tokio::select! {
            _ = self.shutdown.cancelled() => Err(NetError::ConnectionClosed),
            result = exchange => result,
        };

        match result {
            Ok(()) => {
                global_metrics().handshake_success();
                self.state.set(ConnectionState::Validated);
                info!(client_id = self.id, peer = %self.peer, "Client validated");
                Ok(())
            }
            Err(e) => {
                global_metrics().handshake_failed();
                self.state.set(ConnectionState::Closed);
                warn!(client_id = self.id, peer = %self.peer, error = %e, "Client disconnected (failed validation)");
                Err(e)
            }
        }
    }

    /// Client side: answer the server's challenge.
    ///
    /// The client moves to `Validated` as soon as its answer is written.
    pub async fn solve_puzzle(&mut self, timeout: Duration) -> Result<()> {
        self.state.set(ConnectionState::SolvingPuzzle);
        let stream = &mut self.stream;
        let exchange = with_timeout_error(handshake::solve_challenge(stream), timeout);

        let result = tokio::select! {
            _ = self.shutdown.cancelled() => Err(NetError::ConnectionClosed),
            result = exchange => result,
        };

        match result {
            Ok(()) => {
                self.state.set(ConnectionState::Validated);
                debug!(peer = %self.peer, "Handshake answered");
                Ok(())
            }
            Err(e) => {
                self.state.set(ConnectionState::Closed);
                warn!(peer = %self.peer, error = %e, "Handshake with server failed");
                Err(e)
            }
        }
    }

    /// Steady-state loop: read frames into the inbound queue, write queued
    /// frames out, until the socket fails, the peer hangs up or shutdown is
    /// requested. Always leaves the state at `Closed`.
    pub async fn run(self) {
        let Connection {
            id,
            owner,
            peer,
            stream,
            inbound,
            mut outbound,
            shutdown,
            state,
            codec,
        } = self;

        let remote = match owner {
            Owner::Server => Some(id),
            Owner::Client => None,
        };
        let (mut sink, mut frames) = Framed::new(stream, codec).split::<Message<T>>();

        let reader = async {
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(msg) => {
                        global_metrics().message_received(msg.frame_len() as u64);
                        inbound.push_back(OwnedMessage::new(remote, msg));
                    }
                    Err(e) => {
                        match e {
                            NetError::OversizedFrame { .. } | NetError::UnknownMessageKind(_) => {
                                global_metrics().protocol_error()
                            }
                            _ => global_metrics().connection_error(),
                        }
                        warn!(client_id = id, peer = %peer, error = %e, "Read failed");
                        return;
                    }
                }
            }
            debug!(client_id = id, peer = %peer, "Peer closed the connection");
        };

        let writer = async {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    next = outbound.recv() => match next {
                        Some(msg) => msg,
                        None => break,
                    },
                };

                let bytes = msg.frame_len() as u64;
                if let Err(e) = sink.send(msg).await {
                    global_metrics().connection_error();
                    warn!(client_id = id, peer = %peer, error = %e, "Write failed");
                    return;
                }
                global_metrics().message_sent(bytes);
            }

            if let Err(e) = sink.close().await {
                debug!(client_id = id, peer = %peer, error = %e, "Close after shutdown failed");
            }
        };

        tokio::select! {
            _ = reader => {}
            _ = writer => {}
        }

        state.set(ConnectionState::Closed);
        outbound.close();
        info!(client_id = id, peer = %peer, "Connection closed");
    }
}

//! # bsl-net
//!
//! Asynchronous, message-oriented TCP transport shared by a game client and
//! server.
//!
//! A message is a typed header (kind + body length) followed by raw bytes.
//! Connections start with a small challenge/response handshake that turns away
//! peers which do not speak the protocol, then exchange length-prefixed frames.
//! Arrived messages are handed from the I/O threads to the application through
//! a thread-safe queue that the application drains once per tick.
//!
//! ## Layout
//! - [`core`]: messages, frame codec, concurrent queue, body serialization
//! - [`protocol`]: the connection handshake
//! - [`transport`]: connections, the server endpoint and the client endpoint
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and metrics
//!
//! ## Example
//! ```rust,no_run
//! use bsl_net::{Client, Message, Server, ServerHandle, ServerHandler};
//!
//! struct Echo;
//!
//! impl ServerHandler<u32> for Echo {
//!     fn on_message(&self, server: &ServerHandle<u32>, client: u32, msg: Message<u32>) {
//!         server.message_client(client, msg);
//!     }
//! }
//!
//! let mut server = Server::<u32>::new(Echo).unwrap();
//! server.start(2696).unwrap();
//!
//! let mut client = Client::<u32>::new().unwrap();
//! client.connect("localhost", 2696).unwrap();
//! client.send(Message::new(7)).unwrap();
//!
//! loop {
//!     server.update(usize::MAX, true);
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::message::{Message, MessageHeader, MessageKind, OwnedMessage};
pub use crate::core::tsqueue::TsQueue;
pub use crate::error::{NetError, Result};
pub use crate::transport::client::Client;
pub use crate::transport::connection::{ConnectionHandle, ConnectionState, Owner};
pub use crate::transport::server::{Server, ServerHandle, ServerHandler};

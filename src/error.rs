//! # Error Types
//!
//! Error handling for the transport.
//!
//! Transport failures (a read or write failing on a socket) and handshake
//! failures are never handed to the application as values: the connection is
//! closed, the failure is logged, and the application only observes the
//! disconnect. The variants below are what the local API can return.
//!
//! ## Error Categories
//! - **I/O Errors**: bind, connect and socket failures
//! - **Framing Errors**: oversized frames, unknown message kinds
//! - **Body Errors**: extracting more bytes than a message body holds
//! - **Handshake Errors**: wrong challenge response, handshake timeout
//! - **Configuration Errors**: invalid settings, logging setup
//!
//! ## Example Usage
//! ```rust
//! use bsl_net::error::{NetError, Result};
//! use bsl_net::core::message::Message;
//!
//! fn read_id(msg: &mut Message<u32>) -> Result<u32> {
//!     msg.pop::<u32>()
//! }
//!
//! let mut msg = Message::new(1u32);
//! assert!(matches!(read_id(&mut msg), Err(NetError::BodyUnderflow { .. })));
//! ```

use std::io;
use thiserror::Error;

/// Error message constants shared by log lines and error payloads.
pub mod constants {
    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_NOT_CONNECTED: &str = "Not connected to a server";

    /// Handshake errors
    pub const ERR_HANDSHAKE_MISMATCH: &str = "Challenge response did not match";
    pub const ERR_SYSTEM_TIME: &str = "System time error: time went backwards";

    /// Runtime errors
    pub const ERR_RUNTIME_BUILD: &str = "Failed to build I/O runtime";
}

/// NetError is the error type for every fallible operation in the crate
#[derive(Error, Debug)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deserialize error: {0}")]
    DeserializeError(String),

    #[error("{}", constants::ERR_CONNECTION_CLOSED)]
    ConnectionClosed,

    #[error("{}", constants::ERR_NOT_CONNECTED)]
    NotConnected,

    #[error("Frame too large: {size} bytes (max {max})")]
    OversizedFrame { size: usize, max: usize },

    #[error("Unknown message kind: {0}")]
    UnknownMessageKind(u32),

    #[error("Message body underflow: needed {needed} bytes, {available} available")]
    BodyUnderflow { needed: usize, available: usize },

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Endpoint already started")]
    AlreadyStarted,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using NetError
pub type Result<T> = std::result::Result<T, NetError>;

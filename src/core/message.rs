//! # Messages
//!
//! A [`Message`] is a fixed-size [`MessageHeader`] (kind + body length) and a
//! growable byte body.
//!
//! Fixed-size values are appended to and extracted from the *tail* of the
//! body, so a reader must extract values in the reverse order the writer
//! appended them:
//!
//! ```rust
//! use bsl_net::Message;
//!
//! let mut msg = Message::new(3u32);
//! msg.push(&42u32).push(&1.5f32);
//!
//! let speed: f32 = msg.pop().unwrap();
//! let id: u32 = msg.pop().unwrap();
//! assert_eq!((id, speed), (42, 1.5));
//! assert!(msg.body().is_empty());
//! ```
//!
//! Values are copied as raw host-order bytes; both peers must agree on layout
//! and endianness for every kind they exchange.

use std::fmt;
use std::mem::size_of;

use bytemuck::Pod;

use crate::error::{NetError, Result};

/// Size of an encoded header on the wire: `kind: u32` + `size: u32`
pub const HEADER_LEN: usize = 8;

/// Application-defined message tag.
///
/// Any `Copy` type that converts to and from a `u32` qualifies, typically a
/// `#[repr(u32)]` enum. Both ends must share the same mapping.
pub trait MessageKind:
    Copy + fmt::Debug + PartialEq + Send + Sync + 'static + Into<u32> + TryFrom<u32>
{
    /// Raw tag written on the wire
    fn to_wire(self) -> u32 {
        self.into()
    }

    /// Parse a raw wire tag
    fn from_wire(raw: u32) -> Result<Self> {
        Self::try_from(raw).map_err(|_| NetError::UnknownMessageKind(raw))
    }
}

impl<T> MessageKind for T where
    T: Copy + fmt::Debug + PartialEq + Send + Sync + 'static + Into<u32> + TryFrom<u32>
{
}

/// Header sent ahead of every message body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader<T> {
    /// What the body means
    pub kind: T,
    /// Body length in bytes
    pub size: u32,
}

/// A typed header plus an untyped byte body.
///
/// `header.size` always equals `body().len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<T> {
    header: MessageHeader<T>,
    body: Vec<u8>,
}

impl<T: MessageKind> Message<T> {
    /// Create an empty message of the given kind
    pub fn new(kind: T) -> Self {
        Self {
            header: MessageHeader { kind, size: 0 },
            body: Vec::new(),
        }
    }

    /// Build a message from an already-encoded body
    pub fn from_parts(kind: T, body: Vec<u8>) -> Result<Self> {
        let size = u32::try_from(body.len()).map_err(|_| NetError::OversizedFrame {
            size: body.len(),
            max: u32::MAX as usize,
        })?;
        Ok(Self {
            header: MessageHeader { kind, size },
            body,
        })
    }

    pub fn kind(&self) -> T {
        self.header.kind
    }

    pub fn set_kind(&mut self, kind: T) {
        self.header.kind = kind;
    }

    pub fn header(&self) -> &MessageHeader<T> {
        &self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body length in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Size of the whole frame on the wire, header included
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.body.len()
    }

    /// Append a fixed-size value to the tail of the body
    pub fn push<V: Pod>(&mut self, value: &V) -> &mut Self {
        self.push_bytes(bytemuck::bytes_of(value))
    }

    /// Remove a fixed-size value from the tail of the body
    pub fn pop<V: Pod>(&mut self) -> Result<V> {
        let bytes = self.pop_bytes(size_of::<V>())?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    /// Append raw bytes to the tail of the body
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.body.extend_from_slice(bytes);
        self.sync_size();
        self
    }

    /// Remove the last `len` bytes of the body
    pub fn pop_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let available = self.body.len();
        if len > available {
            return Err(NetError::BodyUnderflow {
                needed: len,
                available,
            });
        }
        let tail = self.body.split_off(available - len);
        self.sync_size();
        Ok(tail)
    }

    /// Drop the body, keeping the kind
    pub fn clear(&mut self) {
        self.body.clear();
        self.sync_size();
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    fn sync_size(&mut self) {
        // Frames over u32::MAX are refused by the encoder.
        self.header.size = u32::try_from(self.body.len()).unwrap_or(u32::MAX);
    }
}

impl<T: fmt::Debug> fmt::Display for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID: {:?} Size: {}", self.header.kind, self.header.size)
    }
}

/// A message tagged with the connection it arrived on.
///
/// `remote` is the server-assigned connection ID on the server side and `None`
/// on the client side. It is a lookup key for replying through the server,
/// not a handle that keeps the connection alive.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedMessage<T> {
    pub remote: Option<u32>,
    pub msg: Message<T>,
}

impl<T> OwnedMessage<T> {
    pub fn new(remote: Option<u32>, msg: Message<T>) -> Self {
        Self { remote, msg }
    }
}

impl<T: fmt::Debug> fmt::Display for OwnedMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

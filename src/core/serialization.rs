//! # Body Serialization
//!
//! Structured records inside a message body, for payloads that are not plain
//! fixed-size values (strings, vectors, nested structs).
//!
//! A serialized value follows the same tail discipline as
//! [`Message::push`](crate::core::message::Message::push): it is appended as
//! `[payload] [payload length: u32] [format byte]` and extracted from the tail,
//! so it can be freely mixed with fixed-size values as long as the reader
//! mirrors the writer's order.
//!
//! ## Formats
//! - **Bincode**: compact binary (default)
//! - **JSON**: human-readable, handy when sniffing traffic
//!
//! ## Usage
//! ```rust
//! use bsl_net::Message;
//! use bsl_net::core::serialization::SerializationFormat;
//!
//! let mut msg = Message::new(1u32);
//! msg.push_serialized(&String::from("north"), SerializationFormat::Json).unwrap();
//! msg.push(&3u32);
//!
//! let lane: u32 = msg.pop().unwrap();
//! let region: String = msg.pop_serialized().unwrap();
//! assert_eq!((lane, region.as_str()), (3, "north"));
//! ```

use std::mem::size_of;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::message::{Message, MessageKind};
use crate::error::{NetError, Result};

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationFormat {
    /// Binary compact format (default, fastest)
    #[default]
    Bincode,
    /// Human-readable JSON format (debugging, interop)
    Json,
}

impl SerializationFormat {
    /// Get the format identifier byte stored in the body
    pub fn format_byte(self) -> u8 {
        match self {
            SerializationFormat::Bincode => 0x01,
            SerializationFormat::Json => 0x02,
        }
    }

    /// Detect format from identifier byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(SerializationFormat::Bincode),
            0x02 => Some(SerializationFormat::Json),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            SerializationFormat::Bincode => "Bincode",
            SerializationFormat::Json => "JSON",
        }
    }

    /// Serialize a value in this format
    pub fn serialize<V: Serialize + ?Sized>(self, value: &V) -> Result<Vec<u8>> {
        match self {
            SerializationFormat::Bincode => Ok(bincode::serialize(value)?),
            SerializationFormat::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    /// Deserialize a value in this format
    pub fn deserialize<V: DeserializeOwned>(self, data: &[u8]) -> Result<V> {
        match self {
            SerializationFormat::Bincode => Ok(bincode::deserialize(data)?),
            SerializationFormat::Json => Ok(serde_json::from_slice(data)?),
        }
    }
}

impl<T: MessageKind> Message<T> {
    /// Append a serde value to the tail of the body
    pub fn push_serialized<V: Serialize + ?Sized>(
        &mut self,
        value: &V,
        format: SerializationFormat,
    ) -> Result<&mut Self> {
        let payload = format.serialize(value)?;
        let len = u32::try_from(payload.len()).map_err(|_| NetError::OversizedFrame {
            size: payload.len(),
            max: u32::MAX as usize,
        })?;
        self.push_bytes(&payload);
        self.push(&len);
        self.push(&format.format_byte());
        Ok(self)
    }

    /// Remove a serde value from the tail of the body
    ///
    /// On error the body is left untouched.
    pub fn pop_serialized<V: DeserializeOwned>(&mut self) -> Result<V> {
        const TRAILER: usize = size_of::<u32>() + 1;

        let body = self.body();
        let Some((&byte, rest)) = body.split_last() else {
            return Err(NetError::BodyUnderflow {
                needed: 1,
                available: 0,
            });
        };
        let format = SerializationFormat::from_byte(byte).ok_or_else(|| {
            NetError::DeserializeError(format!("Unknown format byte: {byte}"))
        })?;
        if rest.len() < size_of::<u32>() {
            return Err(NetError::BodyUnderflow {
                needed: size_of::<u32>(),
                available: rest.len(),
            });
        }
        let (rest, len_bytes) = rest.split_at(rest.len() - size_of::<u32>());
        let len = bytemuck::pod_read_unaligned::<u32>(len_bytes) as usize;
        if len > rest.len() {
            return Err(NetError::BodyUnderflow {
                needed: len,
                available: rest.len(),
            });
        }

        let value = format.deserialize(&rest[rest.len() - len..])?;
        self.pop_bytes(len + TRAILER)?;
        Ok(value)
    }
}

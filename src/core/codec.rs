//! # Frame Codec
//!
//! Tokio codec for framing messages over a byte stream.
//!
//! ## Wire Format
//! ```text
//! [kind: u32 LE] [size: u32 LE] [body: size bytes]
//! ```
//!
//! No delimiters. The header is decoded first and `size` is checked against
//! the configured maximum before any room is reserved for the body, so a
//! hostile length field cannot force a large allocation.

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::config::MAX_FRAME_SIZE;
use crate::core::message::{Message, MessageKind, HEADER_LEN};
use crate::error::{NetError, Result};

/// Frames [`Message`]s of kind `T`
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec<T> {
    max_frame_size: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T> FrameCodec<T> {
    /// Codec with the default body limit
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Codec refusing bodies larger than `max_frame_size` bytes
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _kind: PhantomData,
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<T> Default for FrameCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MessageKind> Decoder for FrameCodec<T> {
    type Item = Message<T>;
    type Error = NetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message<T>>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let raw_kind = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        let size = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;

        if size > self.max_frame_size {
            return Err(NetError::OversizedFrame {
                size,
                max: self.max_frame_size,
            });
        }
        let kind = T::from_wire(raw_kind)?;

        let total = HEADER_LEN + size;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let body = src.split_to(size).to_vec();
        debug!(kind = ?kind, bytes = size, "Frame decoded");
        Message::from_parts(kind, body).map(Some)
    }
}

impl<T: MessageKind> Encoder<Message<T>> for FrameCodec<T> {
    type Error = NetError;

    fn encode(&mut self, msg: Message<T>, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Message<T>>>::encode(self, &msg, dst)
    }
}

impl<T: MessageKind> Encoder<&Message<T>> for FrameCodec<T> {
    type Error = NetError;

    fn encode(&mut self, msg: &Message<T>, dst: &mut BytesMut) -> Result<()> {
        let size = msg.size();
        if size > self.max_frame_size {
            return Err(NetError::OversizedFrame {
                size,
                max: self.max_frame_size,
            });
        }

        dst.reserve(HEADER_LEN + size);
        dst.put_u32_le(msg.kind().to_wire());
        dst.put_u32_le(size as u32);
        dst.put_slice(msg.body());
        Ok(())
    }
}

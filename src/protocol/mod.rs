//! # Protocol Layer
//!
//! The exchange that precedes framed traffic on every connection.
//!
//! ## Flow
//! ```text
//! server                      client
//!   | --- challenge (u64) ----> |
//!   | <-- scramble(challenge) - |
//!   |   compare, keep or close  |
//! ```
//!
//! A client that answers wrong, or too slowly, is dropped before any of its
//! frames reach the inbound queue.

pub mod handshake;

#[cfg(test)]
mod tests;

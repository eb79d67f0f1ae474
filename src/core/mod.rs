//! # Core Transport Components
//!
//! Messages, framing and the queue that hands messages between threads.
//!
//! ## Components
//! - **Message**: typed header plus byte body with tail-ordered value access
//! - **Codec**: Tokio codec for framing messages over byte streams
//! - **TsQueue**: mutex-guarded deque with a blocking wait
//! - **Serialization**: serde payloads inside a message body
//!
//! ## Wire Format
//! ```text
//! [Kind(4)] [Size(4)] [Body(Size)]
//! ```
//!
//! ## Limits
//! - Maximum frame body: 16MB by default, configurable per endpoint
//! - Length validated before allocation

pub mod codec;
pub mod message;
pub mod serialization;
pub mod tsqueue;

//! # Transport Layer
//!
//! TCP endpoints built on [`connection::Connection`].
//!
//! - [`server`]: accepts and validates clients, addresses them by ID
//! - [`client`]: a single connection to a server
//!
//! Each connection is driven by one task on the endpoint's runtime. Other
//! threads reach it only through a [`connection::ConnectionHandle`].

pub mod client;
pub mod connection;
pub mod server;

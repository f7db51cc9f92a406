#![warn(missing_docs)]

//! reliudp-core: foundational types shared by every layer.
//!
//! This crate holds the pieces the protocol, per-connection state and host
//! crates all agree on:
//! - Configuration (`Config`)
//! - Error handling (`ErrorKind`, `Result`)
//! - Normalized remote addresses (`PeerAddress`)
//! - The datagram transport trait and packet interception hooks

/// Protocol constants shared across layers.
pub mod constants {
    /// Default number of header bytes carrying the sequence number.
    pub const DEFAULT_SEQUENCE_WIDTH: u8 = 2;
    /// Widest header supported; sequence numbers are held in a `u32`.
    pub const MAX_SEQUENCE_WIDTH: u8 = 4;
    /// Default datagram size in bytes, header included.
    pub const DEFAULT_PACKET_SIZE: usize = 512;
    /// Default idle time in milliseconds before a PING is sent.
    pub const DEFAULT_PING_INTERVAL_MS: u64 = 500;
    /// Default number of retained sent datagrams per connection.
    pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;
}

/// Address normalization for connection lookup.
pub mod address;
/// Configuration options for the protocol and transports.
pub mod config;
/// Error types and results.
pub mod error;
/// Packet interception for custom processing.
pub mod interceptor;
/// Transport abstraction for pluggable I/O.
pub mod transport;

pub use address::{AddressFamily, PeerAddress};
pub use config::Config;
pub use error::{DecodingErrorKind, ErrorKind, Result};

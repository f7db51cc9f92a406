//! Error types for the reliability layer.

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Convenience alias used by every fallible operation in the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Everything that can go wrong while sending, receiving or configuring.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Underlying socket I/O failure; surfaced as-is, never retried internally.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The connection table is full and the address is not yet known.
    #[error("connection table full ({max} connections), refusing {address}")]
    CapacityExceeded {
        /// Address that could not be admitted.
        address: SocketAddr,
        /// Configured table size.
        max: usize,
    },

    /// Payload does not fit in one datagram after the sequence header.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Length handed in by the caller.
        len: usize,
        /// Largest accepted payload.
        max: usize,
    },

    /// The transport was closed while or before an operation was pending.
    #[error("transport closed")]
    TransportClosed,

    /// A datagram could not be decoded.
    #[error("malformed datagram: {0}")]
    Decoding(#[from] DecodingErrorKind),

    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reasons a datagram is rejected by the wire codec.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// Fewer bytes than the configured header width.
    #[error("datagram of {len} bytes is shorter than the {width} byte header")]
    HeaderTooShort {
        /// Received length.
        len: usize,
        /// Configured header width.
        width: u8,
    },

    /// A NAK carried no sequence numbers or a partial one.
    #[error("NAK payload of {len} bytes is not a non-empty multiple of {width}")]
    MalformedNak {
        /// Payload length after the header.
        len: usize,
        /// Configured header width.
        width: u8,
    },

    /// A NAK listed a value outside the data sequence range.
    #[error("NAK requested reserved value {0}")]
    ReservedInNak(u32),
}

#![warn(missing_docs)]

//! reliudp-peer: per-remote connection state and the reliability protocol
//! that drives it.

pub mod connection;
/// Per-connection counters.
pub mod statistics;

pub use connection::{Connection, Incoming, Received};
pub use statistics::ConnectionStatistics;

#![warn(missing_docs)]

//! reliudp-host: the peer endpoint that multiplexes reliable connections over
//! one datagram transport.

/// Connection table keyed by normalized address.
pub mod connection_table;
pub mod context;
pub mod endpoint;
pub mod event_types;
pub mod memory;
pub mod socket;
/// Time sources for the endpoint.
pub mod time;

pub use connection_table::ConnectionTable;
pub use context::NetContext;
pub use endpoint::{CloseHandle, PeerEndpoint};
pub use event_types::{EventType, NetEvent};
pub use memory::{MemoryNetwork, MemoryTransport};
pub use socket::UdpTransport;
pub use time::{Clock, ManualClock, SystemClock};

#![warn(missing_docs)]

//! reliudp: a small public API facade for the workspace.
//!
//! Re-exports what an application needs to exchange sequence-numbered,
//! NAK-recovered datagrams with many remotes over one socket:
//!
//! - Context and endpoint (`NetContext`, `PeerEndpoint`, `CloseHandle`)
//! - Events (`NetEvent`, `EventType`)
//! - Delivery guarantees and configuration (`DeliveryGuarantee`, `Config`)
//!
//! Example
//! ```no_run
//! use reliudp::{Config, DeliveryGuarantee, NetContext};
//!
//! let mut context = NetContext::initialize().unwrap();
//! let mut peer = context.create_peer("127.0.0.1:0", Config::default()).unwrap();
//! let remote = "127.0.0.1:9000".parse().unwrap();
//!
//! peer.send(remote, b"hello", DeliveryGuarantee::Reliable).unwrap();
//!
//! let mut buffer = [0u8; 512];
//! let event = peer.receive(&mut buffer).unwrap();
//! if event.is_receive() {
//!     println!("{:?} sent {:?}", event.address, &buffer[..event.len]);
//! }
//!
//! peer.dispose();
//! context.deinitialize();
//! ```

// Core config and errors
pub use reliudp_core::{
    config::Config,
    error::{ErrorKind, Result},
    interceptor::{Interceptor, Verdict},
};
// Host: endpoint, context and events
pub use reliudp_host::{
    CloseHandle, EventType, ManualClock, MemoryNetwork, NetContext, NetEvent, PeerEndpoint,
    UdpTransport,
};
// Per-remote state
pub use reliudp_peer::{Connection, ConnectionStatistics};
// Protocol: guarantees and sequence arithmetic
pub use reliudp_protocol::{DeliveryGuarantee, SequenceSpace};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        Config, DeliveryGuarantee, ErrorKind, EventType, NetContext, NetEvent, PeerEndpoint,
    };
}

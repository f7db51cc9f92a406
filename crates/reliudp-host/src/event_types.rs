//! Events surfaced to the application by [`PeerEndpoint::receive`].
//!
//! [`PeerEndpoint::receive`]: crate::PeerEndpoint::receive

use std::net::SocketAddr;

use bitflags::bitflags;

bitflags! {
    /// Classification of a receive result. Several flags may be set at once,
    /// e.g. the first datagram from a remote carries `CONNECT | RECEIVE`.
    /// The empty set means nothing happened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventType: u8 {
        /// Application payload was copied into the caller's buffer.
        const RECEIVE = 1 << 0;
        /// First datagram ever seen from this remote address.
        const CONNECT = 1 << 1;
        /// The remote went silent past the disconnect timeout.
        const DISCONNECT = 1 << 2;
    }
}

/// Result of one receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetEvent {
    /// What happened.
    pub kind: EventType,
    /// Remote the event concerns; `None` when nothing happened.
    pub address: Option<SocketAddr>,
    /// Number of payload bytes written to the caller's buffer.
    pub len: usize,
}

impl NetEvent {
    /// Nothing was available.
    pub fn none() -> Self {
        Self::default()
    }

    /// The remote at `address` timed out.
    pub fn disconnect(address: SocketAddr) -> Self {
        Self { kind: EventType::DISCONNECT, address: Some(address), len: 0 }
    }

    /// True when the event carries no flags.
    pub fn is_none(&self) -> bool {
        self.kind.is_empty()
    }

    /// True when payload bytes were delivered.
    pub fn is_receive(&self) -> bool {
        self.kind.contains(EventType::RECEIVE)
    }

    /// True for the first datagram from a remote.
    pub fn is_connect(&self) -> bool {
        self.kind.contains(EventType::CONNECT)
    }

    /// True when the remote timed out.
    pub fn is_disconnect(&self) -> bool {
        self.kind.contains(EventType::DISCONNECT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_event_is_empty() {
        let event = NetEvent::none();
        assert!(event.is_none());
        assert_eq!(event.address, None);
        assert_eq!(event.len, 0);
    }

    #[test]
    fn test_flags_combine() {
        let event = NetEvent {
            kind: EventType::CONNECT | EventType::RECEIVE,
            address: Some("127.0.0.1:1".parse().unwrap()),
            len: 3,
        };
        assert!(event.is_connect());
        assert!(event.is_receive());
        assert!(!event.is_disconnect());
    }
}

//! Explicit setup and teardown of the networking subsystem.

use std::{net::ToSocketAddrs, sync::Arc};

use reliudp_core::{config::Config, error::Result, transport::Socket as TransportSocket};
use tracing::debug;

use crate::{endpoint::PeerEndpoint, socket::UdpTransport, time::Clock};

/// Handle standing for an initialized networking subsystem.
///
/// Endpoints are created through it and it is torn down explicitly. The
/// standard library performs any platform socket setup lazily, so holding the
/// handle costs nothing beyond the bookkeeping below.
#[derive(Debug)]
pub struct NetContext {
    peers_created: usize,
}

impl NetContext {
    /// Initializes the subsystem.
    pub fn initialize() -> Result<Self> {
        debug!("network context initialized");
        Ok(NetContext { peers_created: 0 })
    }

    /// Binds a UDP endpoint at `bind`.
    pub fn create_peer<A: ToSocketAddrs>(
        &mut self,
        bind: A,
        config: Config,
    ) -> Result<PeerEndpoint<UdpTransport>> {
        let endpoint = PeerEndpoint::bind(bind, config)?;
        self.peers_created += 1;
        Ok(endpoint)
    }

    /// Creates an endpoint over a caller-provided transport and clock.
    pub fn create_peer_with_transport<T: TransportSocket>(
        &mut self,
        transport: T,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Result<PeerEndpoint<T>> {
        let endpoint = PeerEndpoint::with_transport(transport, config, clock)?;
        self.peers_created += 1;
        Ok(endpoint)
    }

    /// Number of endpoints created through this context.
    pub fn peers_created(&self) -> usize {
        self.peers_created
    }

    /// Tears the subsystem down.
    pub fn deinitialize(self) {
        debug!(peers_created = self.peers_created, "network context deinitialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryNetwork, time::ManualClock};

    #[test]
    fn test_context_creates_endpoints() {
        let mut context = NetContext::initialize().unwrap();
        let network = MemoryNetwork::new();
        let transport = network.bind("127.0.0.1:5".parse().unwrap(), false, None).unwrap();

        let endpoint = context
            .create_peer_with_transport(transport, Config::default(), Arc::new(ManualClock::new()))
            .unwrap();
        assert_eq!(context.peers_created(), 1);

        endpoint.dispose();
        context.deinitialize();
    }

    #[test]
    fn test_create_peer_binds_udp() {
        let mut context = NetContext::initialize().unwrap();
        let endpoint = context.create_peer("127.0.0.1:0", Config::default()).unwrap();
        assert_ne!(endpoint.local_addr().unwrap().port(), 0);
        context.deinitialize();
    }
}

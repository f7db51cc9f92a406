use std::{
    collections::{hash_map::Entry, HashMap},
    net::SocketAddr,
    time::Instant,
};

use reliudp_core::{
    address::PeerAddress,
    config::Config,
    error::{ErrorKind, Result},
};
use reliudp_peer::Connection;
use tracing::{debug, warn};

/// Connections keyed by normalized remote address, capped at
/// `max_connections`.
#[derive(Debug)]
pub struct ConnectionTable {
    connections: HashMap<PeerAddress, Connection>,
    config: Config,
}

impl ConnectionTable {
    /// Creates an empty table.
    pub fn new(config: Config) -> Self {
        Self { connections: HashMap::new(), config }
    }

    /// Returns the connection for `address`, creating it when there is room.
    ///
    /// The boolean is true when the record was created by this call.
    pub fn resolve(&mut self, address: SocketAddr, time: Instant) -> Result<(&mut Connection, bool)> {
        let max = self.config.max_connections as usize;
        let at_capacity = self.connections.len() >= max;
        match self.connections.entry(PeerAddress::new(address)) {
            Entry::Occupied(entry) => Ok((entry.into_mut(), false)),
            Entry::Vacant(_) if at_capacity => {
                warn!(%address, max, "connection table full, refusing remote");
                Err(ErrorKind::CapacityExceeded { address, max })
            }
            Entry::Vacant(entry) => {
                debug!(%address, "tracking new remote");
                let connection = Connection::new(address, &self.config, time)?;
                Ok((entry.insert(connection), true))
            }
        }
    }

    /// Looks up a connection without creating one.
    pub fn get(&self, address: &SocketAddr) -> Option<&Connection> {
        self.connections.get(&PeerAddress::new(*address))
    }

    /// Mutable lookup without creating.
    pub fn get_mut(&mut self, address: &SocketAddr) -> Option<&mut Connection> {
        self.connections.get_mut(&PeerAddress::new(*address))
    }

    /// Removes and returns the record for `address`.
    pub fn remove(&mut self, address: &SocketAddr) -> Option<Connection> {
        self.connections.remove(&PeerAddress::new(*address))
    }

    /// Keys of every connection silent past the disconnect timeout.
    pub fn timed_out(&self, time: Instant) -> Vec<PeerAddress> {
        self.connections
            .iter()
            .filter(|(_, connection)| connection.is_timed_out(time))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Removes by normalized key.
    pub fn remove_key(&mut self, key: &PeerAddress) -> Option<Connection> {
        self.connections.remove(key)
    }

    /// Iterates over all connections.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Iterates mutably over all connections.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.values_mut()
    }

    /// Number of tracked remotes.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True when no remote is tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use super::*;

    fn table(max_connections: u16) -> ConnectionTable {
        ConnectionTable::new(Config { max_connections, ..Config::default() })
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut table = table(4);
        let addr: SocketAddr = "192.168.1.9:4000".parse().unwrap();
        let time = Instant::now();

        assert!(table.resolve(addr, time).unwrap().1);
        assert!(!table.resolve(addr, time).unwrap().1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_mapped_ipv6_shares_record_with_ipv4() {
        let mut table = table(4);
        let time = Instant::now();
        let v4 = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)), 9000);
        let mapped =
            SocketAddr::new(IpAddr::V6(Ipv4Addr::new(10, 1, 2, 3).to_ipv6_mapped()), 9000);

        table.resolve(v4, time).unwrap();
        assert!(!table.resolve(mapped, time).unwrap().1);
        assert_eq!(table.len(), 1);
        assert!(table.get(&mapped).is_some());
    }

    #[test]
    fn test_same_ip_different_port_is_distinct() {
        let mut table = table(4);
        let time = Instant::now();
        let a = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 1);
        let b = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 2);
        table.resolve(a, time).unwrap();
        table.resolve(b, time).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_capacity_exceeded_then_evict() {
        let mut table = table(1);
        let time = Instant::now();
        let first: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let second: SocketAddr = "127.0.0.1:2".parse().unwrap();

        table.resolve(first, time).unwrap();
        let err = table.resolve(second, time).unwrap_err();
        assert!(matches!(err, ErrorKind::CapacityExceeded { max: 1, .. }));
        // Known addresses still resolve at capacity.
        assert!(table.resolve(first, time).is_ok());

        assert!(table.remove(&first).is_some());
        assert!(table.resolve(second, time).unwrap().1);
    }

    #[test]
    fn test_timed_out_lists_silent_remotes() {
        let mut table = table(4);
        let start = Instant::now();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        table.resolve(addr, start).unwrap();

        let timeout = Config::default().disconnect_timeout;
        assert!(table.timed_out(start + timeout).is_empty());
        assert_eq!(table.timed_out(start + timeout * 2), vec![PeerAddress::new(addr)]);
    }
}

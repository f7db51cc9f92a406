use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
};

/// Address family of a remote endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    /// IPv4, four address bytes.
    V4,
    /// IPv6, sixteen address bytes.
    V6,
}

/// Normalized remote address used as the connection table key.
///
/// Two socket addresses that name the same endpoint compare equal: IPv4-mapped
/// IPv6 addresses collapse to their IPv4 form, and IPv6 flow info / scope ids
/// do not take part in the comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress {
    family: AddressFamily,
    ip: [u8; 16],
    port: u16,
}

impl PeerAddress {
    /// Builds the normalized key for a socket address.
    pub fn new(addr: SocketAddr) -> Self {
        let ip = match addr.ip() {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(v6),
            },
            v4 => v4,
        };
        let (family, bytes) = match ip {
            IpAddr::V4(v4) => {
                let mut bytes = [0u8; 16];
                bytes[..4].copy_from_slice(&v4.octets());
                (AddressFamily::V4, bytes)
            }
            IpAddr::V6(v6) => (AddressFamily::V6, v6.octets()),
        };
        Self { family, ip: bytes, port: addr.port() }
    }

    /// Returns the address family.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Returns the address bytes: 4 for IPv4, 16 for IPv6.
    pub fn ip_bytes(&self) -> &[u8] {
        match self.family {
            AddressFamily::V4 => &self.ip[..4],
            AddressFamily::V6 => &self.ip,
        }
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the IP address.
    pub fn ip(&self) -> IpAddr {
        match self.family {
            AddressFamily::V4 => {
                IpAddr::V4(Ipv4Addr::new(self.ip[0], self.ip[1], self.ip[2], self.ip[3]))
            }
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.ip)),
        }
    }

    /// Converts back into a socket address usable by a transport.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip(), self.port)
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl From<PeerAddress> for SocketAddr {
    fn from(addr: PeerAddress) -> Self {
        addr.socket_addr()
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.socket_addr().fmt(f)
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress({})", self.socket_addr())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddrV6;

    use super::*;

    #[test]
    fn test_same_endpoint_compares_equal() {
        let a: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        let b: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        assert_eq!(PeerAddress::new(a), PeerAddress::new(b));
    }

    #[test]
    fn test_port_and_ip_distinguish_endpoints() {
        let a = PeerAddress::new("10.0.0.1:4000".parse().unwrap());
        let b = PeerAddress::new("10.0.0.1:4001".parse().unwrap());
        let c = PeerAddress::new("10.0.0.2:4000".parse().unwrap());
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ipv4_mapped_ipv6_collapses_to_ipv4() {
        let v4: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let mapped: SocketAddr = "[::ffff:127.0.0.1]:9000".parse().unwrap();
        let key = PeerAddress::new(mapped);
        assert_eq!(key, PeerAddress::new(v4));
        assert_eq!(key.family(), AddressFamily::V4);
        assert_eq!(key.ip_bytes(), &[127, 0, 0, 1]);
        assert_eq!(key.socket_addr(), v4);
    }

    #[test]
    fn test_ipv6_scope_does_not_split_keys() {
        let ip: Ipv6Addr = "fe80::1".parse().unwrap();
        let a = SocketAddr::V6(SocketAddrV6::new(ip, 7000, 0, 1));
        let b = SocketAddr::V6(SocketAddrV6::new(ip, 7000, 5, 2));
        assert_ne!(a, b);
        assert_eq!(PeerAddress::new(a), PeerAddress::new(b));
        assert_eq!(PeerAddress::new(a).family(), AddressFamily::V6);
        assert_eq!(PeerAddress::new(a).ip_bytes().len(), 16);
    }
}

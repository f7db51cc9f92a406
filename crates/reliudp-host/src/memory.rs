//! In-process datagram network.
//!
//! Every [`MemoryTransport`] bound on a [`MemoryNetwork`] owns an inbox
//! channel; sending looks up the destination's inbox and pushes a copy of the
//! bytes. Unknown destinations swallow the datagram like a real network would.

use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use reliudp_core::{address::PeerAddress, transport::Socket as TransportSocket};
use tracing::trace;

type Datagram = (SocketAddr, Vec<u8>);

/// Shared routing table for in-memory transports.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    routes: Arc<Mutex<HashMap<PeerAddress, Sender<Datagram>>>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<PeerAddress, Sender<Datagram>>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attaches a transport at `address`.
    ///
    /// `blocking` makes reads wait up to `read_timeout` before reporting
    /// `TimedOut`; otherwise they return `WouldBlock` immediately.
    pub fn bind(
        &self,
        address: SocketAddr,
        blocking: bool,
        read_timeout: Option<Duration>,
    ) -> io::Result<MemoryTransport> {
        let mut routes = self.routes();
        let key = PeerAddress::new(address);
        if routes.contains_key(&key) {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, address.to_string()));
        }
        let (sender, inbox) = unbounded();
        routes.insert(key, sender);
        Ok(MemoryTransport {
            local: address,
            inbox,
            network: self.clone(),
            blocking,
            read_timeout,
            closed: false,
        })
    }
}

/// One bound address on a [`MemoryNetwork`].
#[derive(Debug)]
pub struct MemoryTransport {
    local: SocketAddr,
    inbox: Receiver<Datagram>,
    network: MemoryNetwork,
    blocking: bool,
    read_timeout: Option<Duration>,
    closed: bool,
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport closed")
}

impl TransportSocket for MemoryTransport {
    fn send_packet(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        match self.network.routes().get(&PeerAddress::new(*addr)) {
            Some(route) => {
                // A dropped receiver behaves like an unreachable host.
                let _ = route.send((self.local, payload.to_vec()));
            }
            None => trace!(to = %addr, "no route, datagram lost"),
        }
        Ok(payload.len())
    }

    fn receive_packet<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(&'a [u8], SocketAddr)> {
        if self.closed {
            return Err(closed_error());
        }
        let (from, bytes) = if self.blocking {
            let received = match self.read_timeout {
                Some(timeout) => self.inbox.recv_timeout(timeout),
                None => self.inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(datagram) => datagram,
                Err(RecvTimeoutError::Timeout) => return Err(io::ErrorKind::TimedOut.into()),
                Err(RecvTimeoutError::Disconnected) => return Err(closed_error()),
            }
        } else {
            match self.inbox.try_recv() {
                Ok(datagram) => datagram,
                Err(TryRecvError::Empty) => return Err(io::ErrorKind::WouldBlock.into()),
                Err(TryRecvError::Disconnected) => return Err(closed_error()),
            }
        };
        // Truncate like recvfrom on an undersized buffer.
        let len = bytes.len().min(buffer.len());
        buffer[..len].copy_from_slice(&bytes[..len]);
        Ok((&buffer[..len], from))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }

    fn is_blocking_mode(&self) -> bool {
        self.blocking
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.network.routes().remove(&PeerAddress::new(self.local));
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}

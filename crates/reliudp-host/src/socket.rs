//! UDP transport backed by `std::net::UdpSocket`.

use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

use reliudp_core::{config::Config, error::Result, transport::Socket as TransportSocket};
use socket2::Socket as Socket2;

/// Applies socket options from configuration to a UdpSocket.
fn apply_socket_options(socket: &UdpSocket, config: &Config) -> io::Result<()> {
    // socket2 view over the same descriptor for buffer sizes
    let socket2 = Socket2::from(socket.try_clone()?);

    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }
    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }
    if let Some(ttl) = config.socket_ttl {
        socket.set_ttl(ttl)?;
    }
    if config.socket_broadcast {
        socket.set_broadcast(true)?;
    }

    Ok(())
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport closed")
}

/// Datagram transport over a bound UDP socket.
///
/// In blocking mode reads wait at most `socket_polling_timeout` so the owner
/// gets a chance to run timers and notice a close request.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    is_blocking_mode: bool,
    closed: bool,
}

impl UdpTransport {
    /// Binds a new socket and configures it.
    pub fn bind<A: ToSocketAddrs>(addresses: A, config: &Config) -> Result<Self> {
        Self::new(UdpSocket::bind(addresses)?, config)
    }

    /// Wraps an already bound socket.
    pub fn new(socket: UdpSocket, config: &Config) -> Result<Self> {
        apply_socket_options(&socket, config)?;
        socket.set_nonblocking(!config.blocking_mode)?;
        if config.blocking_mode {
            socket.set_read_timeout(config.socket_polling_timeout)?;
        }
        Ok(UdpTransport { socket, is_blocking_mode: config.blocking_mode, closed: false })
    }
}

impl TransportSocket for UdpTransport {
    fn send_packet(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        self.socket.send_to(payload, addr)
    }

    fn receive_packet<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(&'a [u8], SocketAddr)> {
        if self.closed {
            return Err(closed_error());
        }
        self.socket.recv_from(buffer).map(move |(recv_len, address)| (&buffer[..recv_len], address))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn is_blocking_mode(&self) -> bool {
        self.is_blocking_mode
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

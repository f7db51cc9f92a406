//! Transport abstraction for pluggable I/O.

use std::{io::Result, net::SocketAddr};

/// Low-level datagram socket abstraction.
///
/// The endpoint only needs connectionless send-to / receive-from plus a way to
/// close; UDP, an in-memory network, or an emulator can all sit behind it.
pub trait Socket {
    /// Sends a single datagram to `addr`, returning the number of bytes written.
    fn send_packet(&mut self, addr: &SocketAddr, payload: &[u8]) -> Result<usize>;

    /// Receives a single datagram into `buffer`.
    ///
    /// Returns `WouldBlock` (or `TimedOut` in blocking mode with a read timeout)
    /// when nothing is available.
    fn receive_packet<'a>(&mut self, buffer: &'a mut [u8]) -> Result<(&'a [u8], SocketAddr)>;

    /// Returns the address this socket is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Returns whether receive blocks until a datagram arrives.
    fn is_blocking_mode(&self) -> bool;

    /// Closes the socket. Later operations fail; the endpoint maps that to
    /// `TransportClosed`.
    fn close(&mut self);

    /// Returns true once the socket has been closed, from any handle.
    fn is_closed(&self) -> bool;
}

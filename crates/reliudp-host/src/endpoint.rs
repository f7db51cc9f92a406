//! The peer endpoint: one transport, many connections.

use std::{
    collections::VecDeque,
    fmt, io,
    net::{SocketAddr, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use reliudp_core::{
    config::Config,
    error::{ErrorKind, Result},
    interceptor::{Interceptor, PassThrough, Verdict},
    transport::Socket as TransportSocket,
};
use reliudp_peer::{Connection, Incoming};
use reliudp_protocol::{packet::Frame, DeliveryGuarantee, SequenceSpace};
use tracing::{debug, error, trace, warn};

use crate::{
    connection_table::ConnectionTable,
    event_types::{EventType, NetEvent},
    socket::UdpTransport,
    time::{Clock, SystemClock},
};

/// Closes an endpoint from another thread.
///
/// A receive blocked on the transport notices the request within one
/// `socket_polling_timeout` and returns `TransportClosed`.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Requests the endpoint to close.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// True once a close was requested.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Owns one datagram transport and the table of remotes reached through it.
///
/// Timers (disconnect detection, NAK emission, pings) run cooperatively in
/// [`poll`](Self::poll), which [`receive`](Self::receive) calls first.
pub struct PeerEndpoint<T: TransportSocket = UdpTransport> {
    transport: T,
    config: Config,
    space: SequenceSpace,
    table: ConnectionTable,
    pending_events: VecDeque<NetEvent>,
    receive_buffer: Vec<u8>,
    interceptor: Box<dyn Interceptor>,
    clock: Arc<dyn Clock>,
    closed: Arc<AtomicBool>,
}

impl<T: TransportSocket> fmt::Debug for PeerEndpoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerEndpoint")
            .field("local_addr", &self.transport.local_addr().ok())
            .field("connections", &self.table.len())
            .field("pending_events", &self.pending_events.len())
            .field("interceptor", &"<interceptor>")
            .finish()
    }
}

impl PeerEndpoint<UdpTransport> {
    /// Binds a UDP socket and creates an endpoint on it.
    pub fn bind<A: ToSocketAddrs>(addresses: A, config: Config) -> Result<Self> {
        config.validate()?;
        let transport = UdpTransport::bind(addresses, &config)?;
        Self::with_transport(transport, config, Arc::new(SystemClock))
    }
}

impl<T: TransportSocket> PeerEndpoint<T> {
    /// Creates an endpoint over any transport, reading time from `clock`.
    pub fn with_transport(transport: T, config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let space = SequenceSpace::new(config.sequence_width)?;
        Ok(PeerEndpoint {
            transport,
            space,
            table: ConnectionTable::new(config.clone()),
            pending_events: VecDeque::new(),
            receive_buffer: vec![0; config.max_packet_size],
            interceptor: Box::new(PassThrough),
            clock,
            closed: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Replaces the datagram interceptor.
    pub fn set_interceptor(&mut self, interceptor: Box<dyn Interceptor>) {
        self.interceptor = interceptor;
    }

    /// Returns the address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle that closes this endpoint from any thread.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle { closed: Arc::clone(&self.closed) }
    }

    /// Closes the transport. Later calls fail with `TransportClosed`.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.transport.close();
    }

    /// True once the endpoint or its transport was closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.transport.is_closed()
    }

    /// Closes the transport and releases every connection.
    pub fn dispose(mut self) {
        self.close();
        self.table.clear();
        debug!("endpoint disposed");
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.is_closed() {
            if !self.transport.is_closed() {
                self.transport.close();
            }
            return Err(ErrorKind::TransportClosed);
        }
        Ok(())
    }

    // ===== Connections =====

    /// Looks up the connection for `address`.
    pub fn connection(&self, address: &SocketAddr) -> Option<&Connection> {
        self.table.get(address)
    }

    /// Mutable lookup, e.g. to attach application data.
    pub fn connection_mut(&mut self, address: &SocketAddr) -> Option<&mut Connection> {
        self.table.get_mut(address)
    }

    /// Forgets a remote, freeing its slot in the table.
    pub fn evict(&mut self, address: &SocketAddr) -> Option<Connection> {
        self.table.remove(address)
    }

    /// Iterates over every tracked remote.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.table.iter()
    }

    /// Number of tracked remotes.
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    // ===== Send path =====

    /// Sends `payload` to `destination`, returning the number of bytes put on
    /// the wire (header included).
    pub fn send(
        &mut self,
        destination: SocketAddr,
        payload: &[u8],
        delivery: DeliveryGuarantee,
    ) -> Result<usize> {
        self.ensure_open()?;
        let max = self.config.max_payload_size();
        if payload.len() > max {
            return Err(ErrorKind::PayloadTooLarge { len: payload.len(), max });
        }

        let time = self.clock.now();
        let (connection, _) = self.table.resolve(destination, time)?;
        let datagram = match delivery {
            DeliveryGuarantee::Reliable => connection.frame_reliable(payload, time)?,
            DeliveryGuarantee::Unreliable => connection.frame_unreliable(payload, time)?,
        };
        trace!(to = %destination, len = datagram.len(), ?delivery, "sending");
        self.transmit(destination, datagram)
    }

    fn transmit(&mut self, address: SocketAddr, mut datagram: Vec<u8>) -> Result<usize> {
        let len = datagram.len();
        if self.interceptor.on_send(&address, &mut datagram) == Verdict::Drop {
            trace!(to = %address, len, "interceptor dropped outgoing datagram");
            return Ok(len);
        }
        match self.transport.send_packet(&address, &datagram) {
            Ok(written) => Ok(written),
            Err(_) if self.transport.is_closed() => Err(ErrorKind::TransportClosed),
            Err(err) => Err(ErrorKind::Transport(err)),
        }
    }

    /// Sends housekeeping datagrams; a failure is logged and the rest go on.
    fn transmit_logged(&mut self, address: SocketAddr, datagram: Vec<u8>) -> Result<()> {
        match self.transmit(address, datagram) {
            Ok(_) => Ok(()),
            Err(ErrorKind::TransportClosed) => Err(ErrorKind::TransportClosed),
            Err(err) => {
                error!(to = %address, "failed to send control datagram: {}", err);
                Ok(())
            }
        }
    }

    // ===== Housekeeping =====

    /// Runs timers: disconnect detection, then NAKs, then pings.
    pub fn poll(&mut self) -> Result<()> {
        self.ensure_open()?;
        let time = self.clock.now();

        for key in self.table.timed_out(time) {
            if let Some(connection) = self.table.remove_key(&key) {
                debug!(address = %connection.remote_address(), "remote timed out");
                // Remotes that never answered were never reported as connected.
                if connection.has_received() {
                    self.pending_events.push_back(NetEvent::disconnect(connection.remote_address()));
                }
            }
        }

        let mut outgoing = Vec::new();
        for connection in self.table.iter_mut() {
            if connection.nak_due(time) {
                if let Some(nak) = connection.frame_nak(time) {
                    outgoing.push((connection.remote_address(), nak));
                }
            }
            if connection.ping_due(time) {
                outgoing.push((connection.remote_address(), connection.frame_ping(time)));
            }
        }
        for (address, datagram) in outgoing {
            self.transmit_logged(address, datagram)?;
        }
        Ok(())
    }

    // ===== Receive path =====

    /// Returns the next event, reading datagrams until one concerns the
    /// application.
    ///
    /// Payload bytes go into `buffer`; a shorter buffer truncates them. In
    /// non-blocking mode an empty event is returned when nothing is pending.
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<NetEvent> {
        self.poll()?;
        loop {
            if let Some(event) = self.pending_events.pop_front() {
                return Ok(event);
            }
            self.ensure_open()?;

            let read = self
                .transport
                .receive_packet(&mut self.receive_buffer)
                .map(|(datagram, from)| (datagram.len(), from));
            let (len, from) = match read {
                Ok(read) => read,
                Err(err) if is_idle(&err) => {
                    if !self.transport.is_blocking_mode() {
                        return Ok(NetEvent::none());
                    }
                    // Blocking read timed out: run timers, check for close, retry.
                    self.poll()?;
                    continue;
                }
                Err(_) if self.is_closed() => {
                    self.close();
                    return Err(ErrorKind::TransportClosed);
                }
                Err(err) => return Err(ErrorKind::Transport(err)),
            };

            if self.interceptor.on_receive(&from, &mut self.receive_buffer[..len]) == Verdict::Drop {
                trace!(from = %from, len, "interceptor dropped incoming datagram");
                continue;
            }

            if let Some(event) = self.handle_datagram(from, len, buffer)? {
                return Ok(event);
            }
        }
    }

    fn handle_datagram(
        &mut self,
        from: SocketAddr,
        len: usize,
        buffer: &mut [u8],
    ) -> Result<Option<NetEvent>> {
        let time = self.clock.now();
        let frame = match Frame::decode(&self.space, &self.receive_buffer[..len]) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(from = %from, len, "dropping malformed datagram: {}", err);
                return Ok(None);
            }
        };

        let (connection, _) = self.table.resolve(from, time)?;
        connection.set_remote_address(from);
        let received = connection.process_frame(frame, time);

        let mut kind = EventType::empty();
        let mut delivered = 0;
        if received.first_contact {
            debug!(from = %from, "remote connected");
            kind |= EventType::CONNECT;
        }

        let mut resend = Vec::new();
        match received.incoming {
            Incoming::Deliver(payload) => {
                delivered = payload.len().min(buffer.len());
                if delivered < payload.len() {
                    warn!(
                        from = %from,
                        len = payload.len(),
                        capacity = buffer.len(),
                        "receive buffer too small, payload truncated"
                    );
                }
                buffer[..delivered].copy_from_slice(&payload[..delivered]);
                kind |= EventType::RECEIVE;
            }
            Incoming::Retransmit(datagrams) => {
                debug!(to = %from, count = datagrams.len(), "retransmitting on request");
                resend = datagrams;
            }
            Incoming::Duplicate | Incoming::Ping => {}
        }

        for datagram in resend {
            self.transmit_logged(from, datagram)?;
        }

        if kind.is_empty() {
            return Ok(None);
        }
        Ok(Some(NetEvent { kind, address: Some(from), len: delivered }))
    }
}

fn is_idle(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

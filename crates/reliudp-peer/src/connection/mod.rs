//! Connection record for one remote address.

use std::{
    any::Any,
    fmt,
    net::SocketAddr,
    time::{Duration, Instant},
};

use reliudp_core::{address::PeerAddress, config::Config, error::Result};
use reliudp_protocol::{SequenceBuffer, SequenceNumber, SequenceSpace};

use crate::statistics::ConnectionStatistics;

mod receiver;
mod sender;

pub use receiver::{Incoming, Received};

/// Exact bytes last transmitted under a sequence number.
#[derive(Debug, Clone)]
pub struct SentDatagram {
    /// Framed datagram, header included, retransmitted verbatim.
    pub bytes: Vec<u8>,
    /// When the datagram was first sent.
    pub sent_at: Instant,
    /// Number of times it was sent again on request.
    pub retransmissions: u32,
}

/// A sequence number the remote sent but this side never received.
#[derive(Debug, Clone, Copy)]
pub struct MissingSequence {
    /// When the gap was detected.
    pub detected_at: Instant,
    /// NAKs already sent for it.
    pub nak_attempts: u8,
}

/// Per-remote-address reliability state.
///
/// Holds the send history used to answer NAKs, the receive-side record of
/// missing sequence numbers, sequence counters and liveness timestamps.
pub struct Connection {
    remote_address: SocketAddr,
    key: PeerAddress,
    space: SequenceSpace,
    config: Config,

    send_history: SequenceBuffer<SentDatagram>,
    missing: SequenceBuffer<MissingSequence>,

    last_sent_seq: SequenceNumber,
    last_received_seq: SequenceNumber,

    last_send_time: Instant,
    last_receive_time: Instant,
    last_nak_time: Option<Instant>,
    has_received: bool,
    has_received_data: bool,

    attached_data: Option<Box<dyn Any + Send>>,
    statistics: ConnectionStatistics,
}

impl Connection {
    /// Creates a fresh record for `addr`.
    ///
    /// Fails only if the configured sequence width is unsupported.
    pub fn new(addr: SocketAddr, config: &Config, time: Instant) -> Result<Connection> {
        let space = SequenceSpace::new(config.sequence_width)?;
        Ok(Connection {
            remote_address: addr,
            key: PeerAddress::new(addr),
            space,
            config: config.to_owned(),
            send_history: SequenceBuffer::with_capacity(config.history_capacity),
            missing: SequenceBuffer::with_capacity(config.history_capacity),
            last_sent_seq: 0,
            last_received_seq: 0,
            last_send_time: time,
            last_receive_time: time,
            last_nak_time: None,
            has_received: false,
            has_received_data: false,
            attached_data: None,
            statistics: ConnectionStatistics::default(),
        })
    }

    /// Socket address the remote was last seen at or last sent to.
    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    /// Records the address the remote was last seen at.
    pub fn set_remote_address(&mut self, address: SocketAddr) {
        self.remote_address = address;
    }

    /// Last time anything was sent to the remote.
    pub fn last_send_time(&self) -> Instant {
        self.last_send_time
    }

    /// Last time anything was received from the remote.
    pub fn last_receive_time(&self) -> Instant {
        self.last_receive_time
    }

    /// Normalized address this record is keyed by.
    pub fn key(&self) -> PeerAddress {
        self.key
    }

    /// Sequence domain shared with the remote.
    pub fn space(&self) -> &SequenceSpace {
        &self.space
    }

    /// Returns the configuration for this connection.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sequence number of the last reliable datagram sent.
    pub fn last_sent_seq(&self) -> SequenceNumber {
        self.last_sent_seq
    }

    /// Newest data sequence number received.
    pub fn last_received_seq(&self) -> SequenceNumber {
        self.last_received_seq
    }

    /// True once any datagram has arrived from the remote.
    pub fn has_received(&self) -> bool {
        self.has_received
    }

    /// True once a sequenced data datagram has arrived from the remote.
    pub fn has_received_data(&self) -> bool {
        self.has_received_data
    }

    /// True while `seq` is still held in the send history.
    pub fn awaiting_ack(&self, seq: SequenceNumber) -> bool {
        self.send_history.exists(seq)
    }

    /// Number of sent datagrams retained for retransmission.
    pub fn history_len(&self) -> usize {
        self.send_history.len()
    }

    /// True while `seq` is recorded as lost on the receive side.
    pub fn is_missing(&self, seq: SequenceNumber) -> bool {
        self.missing.exists(seq)
    }

    /// Sequence numbers currently recorded as lost.
    pub fn missing_sequences(&self) -> Vec<SequenceNumber> {
        self.missing.iter().map(|(seq, _)| seq).collect()
    }

    /// Returns the interval since anything was heard from the remote.
    pub fn last_heard(&self, time: Instant) -> Duration {
        time.saturating_duration_since(self.last_receive_time)
    }

    /// Returns the interval since anything was sent to the remote.
    pub fn last_sent(&self, time: Instant) -> Duration {
        time.saturating_duration_since(self.last_send_time)
    }

    /// True once the remote has been silent longer than the disconnect timeout.
    pub fn is_timed_out(&self, time: Instant) -> bool {
        self.last_heard(time) > self.config.disconnect_timeout
    }

    // ===== Attached application data =====

    /// Attaches an application value, returning the previous one.
    pub fn attach_data<T: Any + Send>(&mut self, data: T) -> Option<Box<dyn Any + Send>> {
        self.attached_data.replace(Box::new(data))
    }

    /// Borrows the attached value if it has type `T`.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.attached_data.as_deref()?.downcast_ref::<T>()
    }

    /// Mutably borrows the attached value if it has type `T`.
    pub fn data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.attached_data.as_deref_mut()?.downcast_mut::<T>()
    }

    /// Detaches and returns the attached value.
    pub fn take_data(&mut self) -> Option<Box<dyn Any + Send>> {
        self.attached_data.take()
    }

    // ===== Statistics =====

    /// Returns a reference to the connection's statistics.
    pub fn statistics(&self) -> &ConnectionStatistics {
        &self.statistics
    }

    /// Returns a mutable reference to the connection's statistics.
    pub fn statistics_mut(&mut self) -> &mut ConnectionStatistics {
        &mut self.statistics
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("remote_address", &self.remote_address)
            .field("last_sent_seq", &self.last_sent_seq)
            .field("last_received_seq", &self.last_received_seq)
            .field("history_len", &self.send_history.len())
            .field("missing", &self.missing.len())
            .field("has_received", &self.has_received)
            .field("has_received_data", &self.has_received_data)
            .field("attached_data", &self.attached_data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        Connection::new("127.0.0.1:7000".parse().unwrap(), &Config::default(), Instant::now())
            .unwrap()
    }

    #[test]
    fn test_fresh_connection_defaults() {
        let conn = connection();
        assert_eq!(conn.last_sent_seq(), 0);
        assert_eq!(conn.last_received_seq(), 0);
        assert_eq!(conn.history_len(), 0);
        assert!(!conn.has_received());
        assert!(!conn.has_received_data());
        assert!(conn.missing_sequences().is_empty());
    }

    #[test]
    fn test_attached_data_round_trips_by_type() {
        let mut conn = connection();
        assert!(conn.data::<String>().is_none());

        assert!(conn.attach_data(String::from("player-1")).is_none());
        assert_eq!(conn.data::<String>().map(String::as_str), Some("player-1"));
        assert!(conn.data::<u32>().is_none());

        conn.data_mut::<String>().unwrap().push_str("-renamed");
        let taken = conn.take_data().unwrap();
        assert_eq!(taken.downcast_ref::<String>().unwrap(), "player-1-renamed");
        assert!(conn.data::<String>().is_none());
    }

    #[test]
    fn test_times_out_after_disconnect_timeout() {
        let start = Instant::now();
        let config = Config::default();
        let conn = Connection::new("127.0.0.1:7000".parse().unwrap(), &config, start).unwrap();
        assert!(!conn.is_timed_out(start + config.disconnect_timeout));
        assert!(conn.is_timed_out(start + config.disconnect_timeout + Duration::from_millis(1)));
    }

    #[test]
    fn test_rejects_bad_width() {
        let mut config = Config::default();
        config.sequence_width = 9;
        assert!(Connection::new("127.0.0.1:7000".parse().unwrap(), &config, Instant::now()).is_err());
    }
}

use std::{default::Default, time::Duration};

use crate::{
    constants::{
        DEFAULT_HISTORY_CAPACITY, DEFAULT_PACKET_SIZE, DEFAULT_PING_INTERVAL_MS,
        DEFAULT_SEQUENCE_WIDTH, MAX_SEQUENCE_WIDTH,
    },
    error::{ErrorKind, Result},
};

#[derive(Clone, Debug)]
/// Configuration options to tune protocol and transport behavior.
pub struct Config {
    /// Make the underlying socket block on receive when true, otherwise non-blocking.
    pub blocking_mode: bool,
    /// Max number of remote addresses tracked by one endpoint.
    pub max_connections: u16,
    /// Max datagram size in bytes, sequence header included.
    pub max_packet_size: usize,
    /// Number of header bytes carrying the sequence number (1..=4).
    pub sequence_width: u8,
    /// Idle send time after which a PING is emitted on a connection.
    pub ping_interval: Duration,
    /// Silence from a remote after which its connection is reported disconnected.
    pub disconnect_timeout: Duration,
    /// Number of sent datagrams kept for retransmission, and of missing sequence
    /// numbers tracked, per connection.
    pub history_capacity: usize,
    /// Minimum time between two NAK datagrams on the same connection.
    pub nak_interval: Duration,
    /// Number of NAKs sent for one missing sequence number before giving up on it.
    pub max_nak_attempts: u8,
    /// Read timeout used in blocking mode so a closed transport is noticed;
    /// must be set and non-zero when `blocking_mode` is true.
    pub socket_polling_timeout: Option<Duration>,
    /// Socket receive buffer size in bytes (None = use system default).
    /// Corresponds to SO_RCVBUF socket option.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = use system default).
    /// Corresponds to SO_SNDBUF socket option.
    pub socket_send_buffer_size: Option<usize>,
    /// Time-to-live for outgoing packets (None = use system default).
    pub socket_ttl: Option<u32>,
    /// Enable broadcast mode (default: false).
    pub socket_broadcast: bool,
}

impl Config {
    /// Number of payload bytes that fit in one datagram after the header.
    pub fn max_payload_size(&self) -> usize {
        self.max_packet_size.saturating_sub(self.sequence_width as usize)
    }

    /// Checks the option combinations the endpoint relies on.
    pub fn validate(&self) -> Result<()> {
        if self.sequence_width == 0 || self.sequence_width > MAX_SEQUENCE_WIDTH {
            return Err(ErrorKind::InvalidConfig(format!(
                "sequence_width must be within 1..={}, got {}",
                MAX_SEQUENCE_WIDTH, self.sequence_width
            )));
        }
        // At least one NAK entry must fit after the header.
        if self.max_packet_size < 2 * self.sequence_width as usize {
            return Err(ErrorKind::InvalidConfig(format!(
                "max_packet_size {} is too small for a {} byte header",
                self.max_packet_size, self.sequence_width
            )));
        }
        if self.history_capacity == 0 {
            return Err(ErrorKind::InvalidConfig("history_capacity must be non-zero".into()));
        }
        let half_range = ((1u64 << (8 * self.sequence_width as u32)) - 3) / 2;
        if self.history_capacity as u64 > half_range {
            return Err(ErrorKind::InvalidConfig(format!(
                "history_capacity {} exceeds half the sequence range ({})",
                self.history_capacity, half_range
            )));
        }
        if self.max_connections == 0 {
            return Err(ErrorKind::InvalidConfig("max_connections must be non-zero".into()));
        }
        // A blocking read without a timeout never returns to notice a close.
        if self.blocking_mode && self.socket_polling_timeout.map_or(true, |t| t.is_zero()) {
            return Err(ErrorKind::InvalidConfig(
                "blocking_mode requires a non-zero socket_polling_timeout".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocking_mode: false,
            max_connections: 64,
            max_packet_size: DEFAULT_PACKET_SIZE,
            sequence_width: DEFAULT_SEQUENCE_WIDTH,
            ping_interval: Duration::from_millis(DEFAULT_PING_INTERVAL_MS),
            disconnect_timeout: Duration::from_secs(5),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            nak_interval: Duration::from_millis(100),
            max_nak_attempts: 8,
            socket_polling_timeout: Some(Duration::from_millis(50)),
            socket_recv_buffer_size: None, // Use system default
            socket_send_buffer_size: None, // Use system default
            socket_ttl: None,              // Use system default
            socket_broadcast: false,
        }
    }
}

//! Connection statistics tracking.
//!
//! Counters for datagrams and payload bytes moved over one connection, plus
//! the NAK traffic and retransmissions the reliability layer generated.

/// Counters for a single connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatistics {
    /// Datagrams sent to this remote, control datagrams included
    pub packets_sent: u64,
    /// Datagrams received from this remote, control datagrams included
    pub packets_received: u64,
    /// Sequenced data datagrams accepted and delivered, duplicates excluded
    pub sequenced_received: u64,
    /// Missing sequence numbers abandoned after the NAK attempt limit
    pub packets_lost: u64,
    /// Application payload bytes sent (excluding headers)
    pub bytes_sent: u64,
    /// Application payload bytes delivered (excluding headers)
    pub bytes_received: u64,
    /// Datagrams resent in answer to a NAK
    pub retransmissions: u64,
    /// NAK datagrams sent
    pub naks_sent: u64,
    /// NAK datagrams received
    pub naks_received: u64,
    /// Data datagrams discarded as already seen
    pub duplicates: u64,
    /// PING datagrams sent
    pub pings_sent: u64,
    /// PING datagrams received
    pub pings_received: u64,
}

impl ConnectionStatistics {
    /// Returns the share of sequenced data that was never recovered (0.0 to 1.0).
    ///
    /// Only sequenced data counts toward the total; PING, NAK and
    /// unsequenced datagrams are left out.
    pub fn packet_loss_rate(&self) -> f32 {
        let expected = self.sequenced_received + self.packets_lost;
        if expected == 0 {
            return 0.0;
        }
        self.packets_lost as f32 / expected as f32
    }

    /// Resets all statistics counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

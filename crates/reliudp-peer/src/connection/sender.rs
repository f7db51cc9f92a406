//! Outgoing side of the reliability protocol.
//!
//! Every method returns the framed datagram; the endpoint hands it to the
//! transport. Bookkeeping happens here so the state is correct even when the
//! caller ends up not sending (for example an interceptor drops it).

use std::time::Instant;

use reliudp_core::error::{ErrorKind, Result};
use reliudp_protocol::{
    packet::{nak_capacity, Frame},
    SequenceNumber,
};
use tracing::{debug, trace};

use super::{Connection, MissingSequence, SentDatagram};

impl Connection {
    fn check_payload(&self, payload: &[u8]) -> Result<()> {
        let max = self.config.max_payload_size();
        if payload.len() > max {
            return Err(ErrorKind::PayloadTooLarge { len: payload.len(), max });
        }
        Ok(())
    }

    fn record_send(&mut self, time: Instant) {
        self.last_send_time = time;
        self.statistics.packets_sent += 1;
    }

    /// Frames `payload` under the next sequence number and stores the datagram
    /// in the send history.
    pub fn frame_reliable(&mut self, payload: &[u8], time: Instant) -> Result<Vec<u8>> {
        self.check_payload(payload)?;

        let sequence = self.space.next(self.last_sent_seq);
        let bytes = Frame::Data { sequence, payload }.to_bytes(&self.space);

        let entry = SentDatagram { bytes: bytes.clone(), sent_at: time, retransmissions: 0 };
        if let Some((expired, _)) = self.send_history.insert(sequence, entry) {
            trace!(to = %self.remote_address, expired, "send history slot reused");
        }

        self.last_sent_seq = sequence;
        self.statistics.bytes_sent += payload.len() as u64;
        self.record_send(time);
        Ok(bytes)
    }

    /// Frames `payload` with the UNSEQUENCED marker. Nothing is remembered.
    pub fn frame_unreliable(&mut self, payload: &[u8], time: Instant) -> Result<Vec<u8>> {
        self.check_payload(payload)?;

        let bytes = Frame::Unsequenced { payload }.to_bytes(&self.space);
        self.statistics.bytes_sent += payload.len() as u64;
        self.record_send(time);
        Ok(bytes)
    }

    /// True when nothing has been sent for longer than the ping interval.
    pub fn ping_due(&self, time: Instant) -> bool {
        self.last_sent(time) > self.config.ping_interval
    }

    /// Frames a PING. The data sequence counter is left untouched.
    pub fn frame_ping(&mut self, time: Instant) -> Vec<u8> {
        self.statistics.pings_sent += 1;
        self.record_send(time);
        Frame::Ping.to_bytes(&self.space)
    }

    /// Returns the stored datagram for `sequence` if the history still holds it.
    pub fn retransmission(&mut self, sequence: SequenceNumber, time: Instant) -> Option<Vec<u8>> {
        let entry = match self.send_history.get_mut(sequence) {
            Some(entry) => entry,
            None => {
                debug!(to = %self.remote_address, sequence, "NAK for sequence no longer in history");
                return None;
            }
        };
        entry.retransmissions += 1;
        let bytes = entry.bytes.clone();

        self.statistics.retransmissions += 1;
        self.record_send(time);
        Some(bytes)
    }

    /// True when gaps are outstanding and the NAK interval has elapsed.
    pub fn nak_due(&self, time: Instant) -> bool {
        if self.missing.is_empty() {
            return false;
        }
        match self.last_nak_time {
            Some(last) => time.saturating_duration_since(last) >= self.config.nak_interval,
            None => true,
        }
    }

    /// Frames a NAK for the oldest outstanding gaps, as many as fit in one
    /// datagram.
    ///
    /// Each listed sequence has its attempt counter bumped; those reaching
    /// `max_nak_attempts` are abandoned and counted as lost.
    pub fn frame_nak(&mut self, time: Instant) -> Option<Vec<u8>> {
        if self.missing.is_empty() {
            return None;
        }

        let last_received = self.last_received_seq;
        let space = self.space;
        let mut missing: Vec<SequenceNumber> = self.missing.iter().map(|(seq, _)| seq).collect();
        // Oldest first: farthest behind the newest received sequence.
        missing.sort_by_key(|seq| std::cmp::Reverse(space.distance_forward(*seq, last_received)));
        missing.truncate(nak_capacity(&self.space, self.config.max_packet_size));

        let max_attempts = self.config.max_nak_attempts;
        for sequence in &missing {
            let exhausted = match self.missing.get_mut(*sequence) {
                Some(MissingSequence { nak_attempts, .. }) => {
                    *nak_attempts = nak_attempts.saturating_add(1);
                    *nak_attempts >= max_attempts
                }
                None => false,
            };
            if exhausted {
                self.missing.remove(*sequence);
                self.statistics.packets_lost += 1;
                debug!(from = %self.remote_address, sequence, "giving up on missing sequence");
            }
        }

        debug!(to = %self.remote_address, count = missing.len(), "requesting retransmission");
        self.last_nak_time = Some(time);
        self.statistics.naks_sent += 1;
        self.record_send(time);
        Some(Frame::Nak { missing }.to_bytes(&self.space))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reliudp_core::config::Config;

    use super::*;

    fn connection_with(config: Config, time: Instant) -> Connection {
        Connection::new("127.0.0.1:7000".parse().unwrap(), &config, time).unwrap()
    }

    #[test]
    fn test_reliable_sends_number_from_one() {
        let time = Instant::now();
        let mut conn = connection_with(Config::default(), time);

        let first = conn.frame_reliable(b"a", time).unwrap();
        let second = conn.frame_reliable(b"b", time).unwrap();
        assert_eq!(first, vec![0, 1, b'a']);
        assert_eq!(second, vec![0, 2, b'b']);
        assert_eq!(conn.last_sent_seq(), 2);
        assert!(conn.awaiting_ack(1));
        assert!(conn.awaiting_ack(2));
        assert_eq!(conn.statistics().bytes_sent, 2);
    }

    #[test]
    fn test_unreliable_leaves_counters_alone() {
        let time = Instant::now();
        let mut conn = connection_with(Config::default(), time);

        let bytes = conn.frame_unreliable(b"x", time).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFD, b'x']);
        assert_eq!(conn.last_sent_seq(), 0);
        assert_eq!(conn.history_len(), 0);
    }

    #[test]
    fn test_oversized_payload_rejected_without_side_effects() {
        let time = Instant::now();
        let config = Config { max_packet_size: 32, ..Config::default() };
        let mut conn = connection_with(config, time);

        let later = time + Duration::from_secs(1);
        let result = conn.frame_reliable(&[0u8; 31], later);
        assert!(matches!(result, Err(ErrorKind::PayloadTooLarge { len: 31, max: 30 })));
        assert_eq!(conn.last_sent_seq(), 0);
        assert_eq!(conn.history_len(), 0);
        assert_eq!(conn.last_send_time(), time);

        assert!(conn.frame_reliable(&[0u8; 30], later).is_ok());
    }

    #[test]
    fn test_history_evicts_on_wrap() {
        let time = Instant::now();
        let config = Config { history_capacity: 4, ..Config::default() };
        let mut conn = connection_with(config, time);

        for _ in 0..5 {
            conn.frame_reliable(b"p", time).unwrap();
        }
        // Sequence 5 reused the slot of sequence 1.
        assert!(!conn.awaiting_ack(1));
        assert!(conn.awaiting_ack(5));
        assert_eq!(conn.history_len(), 4);
        assert!(conn.retransmission(1, time).is_none());
    }

    #[test]
    fn test_retransmission_is_verbatim() {
        let time = Instant::now();
        let mut conn = connection_with(Config::default(), time);

        let original = conn.frame_reliable(b"payload", time).unwrap();
        let resent = conn.retransmission(1, time + Duration::from_millis(10)).unwrap();
        assert_eq!(original, resent);
        assert_eq!(conn.statistics().retransmissions, 1);
        assert_eq!(conn.last_sent_seq(), 1);
    }

    #[test]
    fn test_ping_due_after_interval() {
        let time = Instant::now();
        let config = Config::default();
        let mut conn = connection_with(config.clone(), time);

        assert!(!conn.ping_due(time + config.ping_interval));
        let later = time + config.ping_interval + Duration::from_millis(1);
        assert!(conn.ping_due(later));

        let ping = conn.frame_ping(later);
        assert_eq!(ping, vec![0xFF, 0xFE]);
        assert_eq!(conn.last_sent_seq(), 0);
        assert!(!conn.ping_due(later));
    }

    #[test]
    fn test_nak_not_due_without_gaps() {
        let time = Instant::now();
        let mut conn = connection_with(Config::default(), time);
        assert!(!conn.nak_due(time));
        assert!(conn.frame_nak(time).is_none());
    }
}

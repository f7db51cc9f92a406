//! Incoming side of the reliability protocol: classifies decoded frames.

use std::time::Instant;

use reliudp_protocol::{packet::Frame, SequenceNumber};
use tracing::{debug, trace};

use super::{Connection, MissingSequence};

/// What the endpoint should do with a processed frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming<'a> {
    /// Hand the payload to the application.
    Deliver(&'a [u8]),
    /// Already delivered once; consumed silently.
    Duplicate,
    /// Liveness only.
    Ping,
    /// The remote asked for these stored datagrams again.
    Retransmit(Vec<Vec<u8>>),
}

/// Outcome of [`Connection::process_frame`].
#[derive(Debug, PartialEq, Eq)]
pub struct Received<'a> {
    /// First datagram ever seen from this remote.
    pub first_contact: bool,
    /// Classification of the frame.
    pub incoming: Incoming<'a>,
}

impl Connection {
    /// Applies a decoded frame to the connection state.
    pub fn process_frame<'a>(&mut self, frame: Frame<'a>, time: Instant) -> Received<'a> {
        let first_contact = !self.has_received;
        self.has_received = true;
        self.last_receive_time = time;
        self.statistics.packets_received += 1;

        let incoming = match frame {
            Frame::Ping => {
                self.statistics.pings_received += 1;
                Incoming::Ping
            }
            Frame::Nak { missing } => {
                self.statistics.naks_received += 1;
                let resend = missing
                    .into_iter()
                    .filter_map(|sequence| self.retransmission(sequence, time))
                    .collect();
                Incoming::Retransmit(resend)
            }
            Frame::Unsequenced { payload } => self.deliver(payload),
            Frame::Data { sequence, payload } => self.accept_data(sequence, payload, time),
        };

        Received { first_contact, incoming }
    }

    fn accept_data<'a>(
        &mut self,
        sequence: SequenceNumber,
        payload: &'a [u8],
        time: Instant,
    ) -> Incoming<'a> {
        if !self.has_received_data {
            // Remote counter may be mid-stream; start tracking from here.
            debug!(from = %self.remote_address, sequence, "adopting sequence baseline");
            self.has_received_data = true;
            self.last_received_seq = sequence;
            return self.deliver_sequenced(payload);
        }

        let last = self.last_received_seq;

        if self.space.is_ahead(last, sequence) {
            let distance = self.space.distance_forward(last, sequence);
            if distance > 1 {
                self.mark_missing(last, distance - 1, time);
            }
            self.last_received_seq = sequence;
            return self.deliver_sequenced(payload);
        }

        if self.missing.remove(sequence).is_some() {
            debug!(from = %self.remote_address, sequence, "recovered missing sequence");
            return self.deliver_sequenced(payload);
        }

        trace!(from = %self.remote_address, sequence, "duplicate datagram dropped");
        self.statistics.duplicates += 1;
        Incoming::Duplicate
    }

    /// Records the `count` sequence numbers following `after` as missing,
    /// keeping only the most recent `history_capacity` of them.
    fn mark_missing(&mut self, after: SequenceNumber, count: SequenceNumber, time: Instant) {
        let capacity = self.missing.capacity() as u64;
        let count = count as u64;
        let skipped = count.saturating_sub(capacity);
        let max = self.space.max() as u64;

        if skipped > 0 {
            self.statistics.packets_lost += skipped;
        }
        for offset in (skipped + 1)..=count {
            let sequence = ((after as u64 + offset) % max) as SequenceNumber;
            let entry = MissingSequence { detected_at: time, nak_attempts: 0 };
            if let Some((evicted, _)) = self.missing.insert(sequence, entry) {
                if evicted != sequence {
                    self.statistics.packets_lost += 1;
                }
            }
        }
        debug!(from = %self.remote_address, count, "gap detected");
    }

    fn deliver<'a>(&mut self, payload: &'a [u8]) -> Incoming<'a> {
        self.statistics.bytes_received += payload.len() as u64;
        Incoming::Deliver(payload)
    }

    fn deliver_sequenced<'a>(&mut self, payload: &'a [u8]) -> Incoming<'a> {
        self.statistics.sequenced_received += 1;
        self.deliver(payload)
    }
}

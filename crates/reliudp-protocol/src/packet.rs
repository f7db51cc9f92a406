//! Datagram framing.
//!
//! Every datagram is a `width`-byte big-endian header followed by 0..N bytes:
//!
//! | header              | body                                          |
//! |---------------------|-----------------------------------------------|
//! | data sequence `s`   | application payload, tracked under `s`        |
//! | UNSEQUENCED (`MAX`) | application payload, no tracking              |
//! | PING (`MAX + 1`)    | empty                                         |
//! | NAK (`MAX + 2`)     | one or more `width`-byte missing sequences    |

use std::io::Cursor;

use reliudp_core::error::DecodingErrorKind;

use crate::sequence::{SequenceNumber, SequenceSpace};

/// Enum to specify how a payload should be delivered.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq, Default)]
pub enum DeliveryGuarantee {
    /// Sent once, never retransmitted.
    #[default]
    Unreliable,
    /// Sequenced, kept in history and retransmitted on NAK.
    Reliable,
}

/// A decoded datagram borrowing its payload from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Payload tracked under a data sequence number.
    Data {
        /// Sequence number from the header.
        sequence: SequenceNumber,
        /// Application bytes.
        payload: &'a [u8],
    },
    /// Payload sent without sequence tracking.
    Unsequenced {
        /// Application bytes.
        payload: &'a [u8],
    },
    /// Liveness probe.
    Ping,
    /// Request to retransmit the listed sequence numbers.
    Nak {
        /// Missing sequence numbers, in the order the remote listed them.
        missing: Vec<SequenceNumber>,
    },
}

impl<'a> Frame<'a> {
    /// Decodes a datagram.
    pub fn decode(space: &SequenceSpace, datagram: &'a [u8]) -> Result<Self, DecodingErrorKind> {
        let (header, body) = space.split_header(datagram)?;
        if header == space.ping() {
            // Trailing bytes on a ping carry no meaning.
            return Ok(Frame::Ping);
        }
        if header == space.nak() {
            return Ok(Frame::Nak { missing: decode_nak_body(space, body)? });
        }
        if header == space.unsequenced() {
            return Ok(Frame::Unsequenced { payload: body });
        }
        Ok(Frame::Data { sequence: header, payload: body })
    }

    /// Appends the encoded datagram to `out`.
    pub fn encode(&self, space: &SequenceSpace, out: &mut Vec<u8>) {
        match self {
            Frame::Data { sequence, payload } => {
                space.write(out, *sequence);
                out.extend_from_slice(payload);
            }
            Frame::Unsequenced { payload } => {
                space.write(out, space.unsequenced());
                out.extend_from_slice(payload);
            }
            Frame::Ping => space.write(out, space.ping()),
            Frame::Nak { missing } => {
                space.write(out, space.nak());
                for sequence in missing {
                    space.write(out, *sequence);
                }
            }
        }
    }

    /// Encodes into a fresh buffer.
    pub fn to_bytes(&self, space: &SequenceSpace) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len(space));
        self.encode(space, &mut out);
        out
    }

    /// Size of the encoded datagram in bytes.
    pub fn encoded_len(&self, space: &SequenceSpace) -> usize {
        let width = space.width() as usize;
        width
            + match self {
                Frame::Data { payload, .. } | Frame::Unsequenced { payload } => payload.len(),
                Frame::Ping => 0,
                Frame::Nak { missing } => missing.len() * width,
            }
    }
}

/// Number of missing sequence numbers one NAK can carry in `max_packet_size` bytes.
pub fn nak_capacity(space: &SequenceSpace, max_packet_size: usize) -> usize {
    let width = space.width() as usize;
    max_packet_size.saturating_sub(width) / width
}

fn decode_nak_body(
    space: &SequenceSpace,
    body: &[u8],
) -> Result<Vec<SequenceNumber>, DecodingErrorKind> {
    let width = space.width() as usize;
    if body.is_empty() || body.len() % width != 0 {
        return Err(DecodingErrorKind::MalformedNak { len: body.len(), width: space.width() });
    }
    let mut cursor = Cursor::new(body);
    let mut missing = Vec::with_capacity(body.len() / width);
    for _ in 0..body.len() / width {
        let sequence = space
            .read(&mut cursor)
            .map_err(|_| DecodingErrorKind::MalformedNak { len: body.len(), width: space.width() })?;
        if !space.is_data(sequence) {
            return Err(DecodingErrorKind::ReservedInNak(sequence));
        }
        missing.push(sequence);
    }
    Ok(missing)
}

//! Sequence-number domain.
//!
//! A header of `width` bytes can carry `2^(8·width)` values. The top three are
//! reserved as control sentinels, leaving `MAX = 2^(8·width) − 3` data
//! sequence numbers that wrap modulo `MAX`.

use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use reliudp_core::{
    constants::MAX_SEQUENCE_WIDTH,
    error::{DecodingErrorKind, ErrorKind, Result},
};

/// Sequence numbers and sentinels share this type.
pub type SequenceNumber = u32;

/// Arithmetic over the sequence range for one header width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpace {
    width: u8,
    max: SequenceNumber,
}

impl SequenceSpace {
    /// Creates the space for a header of `width` bytes.
    pub fn new(width: u8) -> Result<Self> {
        if width == 0 || width > MAX_SEQUENCE_WIDTH {
            return Err(ErrorKind::InvalidConfig(format!(
                "sequence width must be within 1..={}, got {}",
                MAX_SEQUENCE_WIDTH, width
            )));
        }
        let max = ((1u64 << (8 * width as u32)) - 3) as SequenceNumber;
        Ok(Self { width, max })
    }

    /// Header width in bytes.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Number of data sequence numbers; also the UNSEQUENCED sentinel.
    pub fn max(&self) -> SequenceNumber {
        self.max
    }

    /// Marks a payload sent without sequence tracking.
    pub fn unsequenced(&self) -> SequenceNumber {
        self.max
    }

    /// Liveness-only datagram.
    pub fn ping(&self) -> SequenceNumber {
        self.max + 1
    }

    /// Retransmission request.
    pub fn nak(&self) -> SequenceNumber {
        self.max + 2
    }

    /// Successor of `seq`, wrapping at `MAX`. Never produces a sentinel.
    pub fn next(&self, seq: SequenceNumber) -> SequenceNumber {
        ((seq as u64 + 1) % self.max as u64) as SequenceNumber
    }

    /// True for the PING and NAK control values.
    pub fn is_reserved(&self, value: SequenceNumber) -> bool {
        value == self.ping() || value == self.nak()
    }

    /// True for any value outside the data range, UNSEQUENCED included.
    pub fn is_sentinel(&self, value: SequenceNumber) -> bool {
        value >= self.max
    }

    /// True for a data sequence number.
    pub fn is_data(&self, value: SequenceNumber) -> bool {
        value < self.max
    }

    /// Number of `next` steps needed to go from `a` to `b`.
    pub fn distance_forward(&self, a: SequenceNumber, b: SequenceNumber) -> SequenceNumber {
        let max = self.max as u64;
        ((b as u64 % max + max - a as u64 % max) % max) as SequenceNumber
    }

    /// True when `b` is newer than `a`: at most half the range ahead of it.
    pub fn is_ahead(&self, a: SequenceNumber, b: SequenceNumber) -> bool {
        let distance = self.distance_forward(a, b);
        distance != 0 && distance <= self.max / 2
    }

    /// Appends `value` as a big-endian header of `width` bytes.
    pub fn write(&self, out: &mut Vec<u8>, value: SequenceNumber) {
        // Writing into a Vec cannot fail.
        let _ = out.write_uint::<BigEndian>(value as u64, self.width as usize);
    }

    /// Reads one `width`-byte big-endian value from the cursor.
    pub fn read(&self, cursor: &mut Cursor<&[u8]>) -> io::Result<SequenceNumber> {
        Ok(cursor.read_uint::<BigEndian>(self.width as usize)? as SequenceNumber)
    }

    /// Splits a datagram into its header value and payload.
    pub fn split_header<'a>(
        &self,
        datagram: &'a [u8],
    ) -> std::result::Result<(SequenceNumber, &'a [u8]), DecodingErrorKind> {
        let width = self.width as usize;
        if datagram.len() < width {
            return Err(DecodingErrorKind::HeaderTooShort { len: datagram.len(), width: self.width });
        }
        let mut cursor = Cursor::new(&datagram[..width]);
        let value = self
            .read(&mut cursor)
            .map_err(|_| DecodingErrorKind::HeaderTooShort { len: datagram.len(), width: self.width })?;
        Ok((value, &datagram[width..]))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_default_width_constants() {
        let space = SequenceSpace::new(2).unwrap();
        assert_eq!(space.max(), 65533);
        assert_eq!(space.unsequenced(), 65533);
        assert_eq!(space.ping(), 65534);
        assert_eq!(space.nak(), 65535);
        assert!(space.is_reserved(65534));
        assert!(space.is_reserved(65535));
        assert!(!space.is_reserved(65533));
        assert!(space.is_sentinel(65533));
        assert!(space.is_data(65532));
    }

    #[test]
    fn test_single_byte_width_layout() {
        let space = SequenceSpace::new(1).unwrap();
        assert_eq!(space.max(), 253);
        assert_eq!(space.ping(), 254);
        assert_eq!(space.nak(), 255);
    }

    #[test]
    fn test_widest_header_fits_u32() {
        let space = SequenceSpace::new(4).unwrap();
        assert_eq!(space.nak(), u32::MAX);
        assert_eq!(space.next(space.max() - 1), 0);
    }

    #[test]
    fn test_rejects_unsupported_width() {
        assert!(SequenceSpace::new(0).is_err());
        assert!(SequenceSpace::new(5).is_err());
    }

    #[test]
    fn test_next_wraps_before_sentinels() {
        let space = SequenceSpace::new(1).unwrap();
        assert_eq!(space.next(0), 1);
        assert_eq!(space.next(252), 0);
    }

    #[test]
    fn test_distance_accounts_for_wrap() {
        let space = SequenceSpace::new(1).unwrap();
        assert_eq!(space.distance_forward(250, 2), 5);
        assert_eq!(space.distance_forward(2, 250), 248);
        assert!(space.is_ahead(250, 2));
        assert!(!space.is_ahead(2, 250));
        assert!(!space.is_ahead(7, 7));
    }

    #[test]
    fn test_header_round_trip_is_big_endian() {
        let space = SequenceSpace::new(2).unwrap();
        let mut out = Vec::new();
        space.write(&mut out, 0x0102);
        out.extend_from_slice(b"hi");
        assert_eq!(out, vec![0x01, 0x02, b'h', b'i']);

        let (value, payload) = space.split_header(&out).unwrap();
        assert_eq!(value, 0x0102);
        assert_eq!(payload, b"hi");
    }

    #[test]
    fn test_short_datagram_is_rejected() {
        let space = SequenceSpace::new(2).unwrap();
        assert_eq!(
            space.split_header(&[7]),
            Err(DecodingErrorKind::HeaderTooShort { len: 1, width: 2 })
        );
    }

    proptest! {
        #[test]
        fn test_next_is_one_step_forward(width in 1u8..=4, raw in any::<u32>()) {
            let space = SequenceSpace::new(width).unwrap();
            let seq = raw % space.max();
            let next = space.next(seq);
            prop_assert!(space.is_data(next));
            prop_assert_eq!(space.distance_forward(seq, next), 1);
            prop_assert!(space.is_ahead(seq, next));
        }

        #[test]
        fn test_distance_to_self_is_zero(width in 1u8..=4, raw in any::<u32>()) {
            let space = SequenceSpace::new(width).unwrap();
            let seq = raw % space.max();
            prop_assert_eq!(space.distance_forward(seq, seq), 0);
        }

        #[test]
        fn test_forward_and_backward_distances_cover_the_range(
            width in 1u8..=4,
            a in any::<u32>(),
            b in any::<u32>(),
        ) {
            let space = SequenceSpace::new(width).unwrap();
            let (a, b) = (a % space.max(), b % space.max());
            prop_assume!(a != b);
            let there = space.distance_forward(a, b) as u64;
            let back = space.distance_forward(b, a) as u64;
            prop_assert_eq!(there + back, space.max() as u64);
        }
    }
}

#![warn(missing_docs)]

//! reliudp-protocol: sequence numbers, ring buffers and datagram framing.

/// Datagram framing and delivery guarantees.
pub mod packet;
/// Sequence-number domain with wraparound and control sentinels.
pub mod sequence;
/// Ring buffers keyed by sequence number.
pub mod sequence_buffer;

pub use packet::{DeliveryGuarantee, Frame};
pub use sequence::{SequenceNumber, SequenceSpace};
pub use sequence_buffer::SequenceBuffer;

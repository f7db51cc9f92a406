//! Datagram interception hooks.
//!
//! An [`Interceptor`] sees every framed datagram right before it reaches the
//! transport and right after one is read from it. It can rewrite bytes in
//! place or drop the datagram, which is how tests simulate loss and how
//! applications plug in inspection.

use std::net::SocketAddr;

/// What to do with an intercepted datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the datagram on.
    Pass,
    /// Discard it silently, as if the network lost it.
    Drop,
}

/// Hook invoked on the raw framed datagram in both directions.
///
/// # Examples
/// ```
/// use std::net::SocketAddr;
/// use reliudp_core::interceptor::{Interceptor, Verdict};
///
/// /// Loses every third outgoing datagram.
/// struct EveryThird(usize);
///
/// impl Interceptor for EveryThird {
///     fn on_send(&mut self, _to: &SocketAddr, _datagram: &mut Vec<u8>) -> Verdict {
///         self.0 += 1;
///         if self.0 % 3 == 0 { Verdict::Drop } else { Verdict::Pass }
///     }
/// }
/// ```
pub trait Interceptor: Send {
    /// Called with the full datagram (header included) before transmission.
    fn on_send(&mut self, _to: &SocketAddr, _datagram: &mut Vec<u8>) -> Verdict {
        Verdict::Pass
    }

    /// Called with the full datagram after it was read, before decoding.
    fn on_receive(&mut self, _from: &SocketAddr, _datagram: &mut [u8]) -> Verdict {
        Verdict::Pass
    }
}

/// Interceptor that passes everything through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Interceptor for PassThrough {}

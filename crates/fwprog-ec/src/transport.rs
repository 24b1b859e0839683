//! Transport abstraction
//!
//! A transport moves one fully framed request to the EC and returns the
//! framed response. Framing, checksums and status decoding live in
//! [`crate::proto`]; transports only know how to move bytes, so the same
//! protocol code drives every bus the EC can sit on.

use maybe_async::maybe_async;

use crate::error::Result;

/// Default frame budget when the bus does not impose a tighter one
pub const DEFAULT_MAX_FRAME_LEN: usize = 0x100;

/// A byte-level channel to an EC
#[maybe_async(AFIT)]
pub trait EcTransport {
    /// Largest frame the bus can carry in either direction.
    fn max_frame_len(&self) -> usize {
        DEFAULT_MAX_FRAME_LEN
    }

    /// Send one framed request and receive the framed response into
    /// `response`, returning the number of bytes received.
    async fn exchange(&mut self, request: &[u8], response: &mut [u8]) -> Result<usize>;

    /// Busy-wait or sleep for at least `us` microseconds.
    async fn delay_us(&mut self, us: u32);
}

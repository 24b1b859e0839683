//! Programmer-facing traits
//!
//! Two kinds of hardware drive a flash chip. A [`SpiBus`] hands us the
//! raw SPI wire and we speak the chip protocol ourselves. An
//! [`OpaqueProgrammer`] keeps the protocol on its side of the fence and
//! only offers address-based read, write and erase.
//!
//! Both traits go through `maybe_async`: async by default, blocking when
//! the `is_sync` feature is on.

use crate::error::Result;
use crate::spi::SpiOp;
use bitflags::bitflags;
use maybe_async::maybe_async;

bitflags! {
    /// Capabilities a SPI programmer advertises
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiCaps: u32 {
        /// Can issue opcodes with a 4-byte address phase
        const FOUR_BYTE_ADDR = 1 << 0;
        /// Cannot drive chips switched into 4-byte address mode
        const NO_4BA_MODES   = 1 << 1;
    }
}

impl Default for SpiCaps {
    fn default() -> Self {
        SpiCaps::empty()
    }
}

/// A programmer that exposes the raw SPI wire
#[maybe_async(AFIT)]
pub trait SpiBus {
    /// Capability flags for this programmer
    fn caps(&self) -> SpiCaps;

    /// Largest rx payload one transaction can carry
    fn max_read(&self) -> usize;

    /// Largest tx payload one transaction can carry
    fn max_write(&self) -> usize;

    /// Clock one transaction over the wire
    ///
    /// Sends the opcode, address and dummy prefix, then the tx bytes,
    /// and fills the rx buffer from the remaining clocks.
    async fn run(&mut self, op: &mut SpiOp<'_>) -> Result<()>;

    /// Whether the programmer will pass this opcode through
    ///
    /// Intermediaries with opcode allowlists override this so probing
    /// can avoid commands that would be silently dropped.
    fn opcode_allowed(&self, _opcode: u8) -> bool {
        true
    }

    /// Busy-wait or sleep for `us` microseconds
    async fn delay_us(&mut self, us: u32);
}

/// A programmer that keeps the flash protocol to itself
///
/// The host only sees a linear address space. Sector management, status
/// polling and protocol details all happen on the device.
#[maybe_async(AFIT)]
pub trait OpaqueProgrammer {
    /// Flash size in bytes as reported by the device
    fn size(&self) -> usize;

    /// Fill `buf` from flash starting at `addr`
    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` at `addr`; the range must already be erased
    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase `len` bytes starting at `addr`
    async fn erase(&mut self, addr: u32, len: u32) -> Result<()>;
}

// Async trait methods are not object-safe, so boxed buses exist only in
// sync mode.
#[cfg(all(feature = "alloc", feature = "is_sync"))]
impl SpiBus for alloc::boxed::Box<dyn SpiBus + Send> {
    fn caps(&self) -> SpiCaps {
        (**self).caps()
    }

    fn max_read(&self) -> usize {
        (**self).max_read()
    }

    fn max_write(&self) -> usize {
        (**self).max_write()
    }

    fn run(&mut self, op: &mut SpiOp<'_>) -> Result<()> {
        (**self).run(op)
    }

    fn opcode_allowed(&self, opcode: u8) -> bool {
        (**self).opcode_allowed(opcode)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Run a [`SpiOp`] through a plain transmit/receive transfer function.
///
/// Hardware that only offers "shift these bytes out, shift those bytes
/// in" needs the op serialized first. This builds the outgoing buffer
/// (prefix plus tx payload) and hands it to `transfer` together with the
/// rx buffer to fill.
///
/// ```ignore
/// fn run(&mut self, op: &mut SpiOp<'_>) -> Result<()> {
///     run_via(op, |tx, rx| self.xfer(tx, rx))
/// }
/// ```
#[cfg(feature = "alloc")]
pub fn run_via<F>(op: &mut SpiOp<'_>, transfer: F) -> Result<()>
where
    F: FnOnce(&[u8], &mut [u8]) -> Result<()>,
{
    let prefix = op.prefix_len();
    let mut out = alloc::vec![0u8; prefix + op.tx.len()];
    op.encode_prefix(&mut out);
    out[prefix..].copy_from_slice(op.tx);

    transfer(&out, op.rx)
}

/// Registry metadata for one programmer backend
#[derive(Debug, Clone)]
pub struct ProgrammerInfo {
    /// Canonical name used on the command line
    pub name: &'static str,
    /// Accepted alternative spellings
    pub aliases: &'static [&'static str],
    /// One-line description for listings
    pub description: &'static str,
    /// Needs elevated privileges to open the hardware
    pub requires_root: bool,
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use crate::spi::AddrWidth;

    #[test]
    fn run_via_serializes_prefix_and_payload() {
        let data = [0xDE, 0xAD];
        let mut op = SpiOp::data_write(AddrWidth::Three, 0x02, 0x1234, &data);
        let mut seen = alloc::vec::Vec::new();
        run_via(&mut op, |tx, _rx| {
            seen.extend_from_slice(tx);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, &[0x02, 0x00, 0x12, 0x34, 0xDE, 0xAD]);
    }

    #[test]
    fn run_via_hands_out_rx_buffer() {
        let mut rx = [0u8; 2];
        let mut op = SpiOp::reg_read(0x05, &mut rx);
        run_via(&mut op, |tx, rx| {
            assert_eq!(tx, &[0x05]);
            rx.fill(0x42);
            Ok(())
        })
        .unwrap();
        assert_eq!(rx, [0x42, 0x42]);
    }
}

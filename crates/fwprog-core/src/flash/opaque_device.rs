//! [`FlashDevice`] over a programmer that hides the flash protocol

use crate::chip::{EraseBlock, WriteGranularity};
use crate::error::{Error, Result};
use crate::flash::device::FlashDevice;
use crate::programmer::OpaqueProgrammer;
use crate::spi::opcodes;
use maybe_async::maybe_async;

const DEFAULT_ERASE_BLOCK: u32 = 4096;

/// An opaque programmer presented through the device interface
///
/// There is no probed chip behind this adapter; the programmer reports
/// its own size and the erase granularity defaults to 4 KiB until the
/// caller overrides it with what the hardware actually uses.
pub struct OpaqueFlashDevice<P: OpaqueProgrammer> {
    prog: P,
    size: u32,
    erase_block: u32,
    erase_blocks: [EraseBlock; 1],
}

impl<P: OpaqueProgrammer> OpaqueFlashDevice<P> {
    /// Wrap a programmer, taking the size it reports
    pub fn new(prog: P) -> Self {
        let size = prog.size() as u32;
        Self::with_size(prog, size)
    }

    /// Wrap a programmer whose size was learned some other way
    pub fn with_size(prog: P, size: u32) -> Self {
        Self {
            prog,
            size,
            erase_block: DEFAULT_ERASE_BLOCK,
            erase_blocks: [EraseBlock::new(opcodes::ERASE_SECTOR_4K, DEFAULT_ERASE_BLOCK)],
        }
    }

    /// Override the erase granularity the hardware enforces
    pub fn set_erase_block_size(&mut self, size: u32) {
        self.erase_block = size;
        self.erase_blocks = [EraseBlock::new(opcodes::ERASE_SECTOR_4K, size)];
    }

    /// The underlying programmer
    pub fn programmer(&mut self) -> &mut P {
        &mut self.prog
    }

    /// Shared view of the underlying programmer
    pub fn programmer_ref(&self) -> &P {
        &self.prog
    }
}

#[maybe_async(AFIT)]
impl<P: OpaqueProgrammer> FlashDevice for OpaqueFlashDevice<P> {
    fn size(&self) -> u32 {
        self.size
    }

    fn min_erase_size(&self) -> u32 {
        self.erase_block
    }

    fn write_granularity(&self) -> WriteGranularity {
        // The device buffers pages itself and erases under the hood
        WriteGranularity::Bit
    }

    fn erase_blocks(&self) -> &[EraseBlock] {
        &self.erase_blocks
    }

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        if !self.in_bounds(addr, buf.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        self.prog.read(addr, buf).await
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if !self.in_bounds(addr, data.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        self.prog.write(addr, data).await
    }

    async fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        if !self.in_bounds(addr, len as usize) {
            return Err(Error::AddressOutOfBounds);
        }
        if addr % self.erase_block != 0 || len % self.erase_block != 0 {
            return Err(Error::InvalidAlignment);
        }
        self.prog.erase(addr, len).await
    }
}

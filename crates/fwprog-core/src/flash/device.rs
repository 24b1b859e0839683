//! The device trait both adapter kinds implement

use crate::chip::{EraseBlock, WriteGranularity};
use crate::error::Result;
#[cfg(feature = "alloc")]
use crate::wp::{WpConfig, WpError, WpMode, WpRange, WpResult, WriteOptions};
use maybe_async::maybe_async;

/// One surface for every flash target
///
/// Callers see a linear 32-bit address space with read, write and erase,
/// plus optional write protection and pre/post write hooks. Behind the
/// trait sits either a probed SPI chip driven over a raw bus or a
/// programmer that keeps the protocol to itself.
///
/// The protection methods default to [`WpError::ChipUnsupported`]; only
/// devices with a known protection scheme override them.
#[maybe_async(AFIT)]
pub trait FlashDevice {
    /// Capacity in bytes
    fn size(&self) -> u32;

    /// Smallest erasable unit; erase calls align to this
    fn min_erase_size(&self) -> u32;

    /// What a write can change without an erase first
    fn write_granularity(&self) -> WriteGranularity;

    /// Erase block sizes the device offers, smallest first
    fn erase_blocks(&self) -> &[EraseBlock];

    /// Fill `buf` from flash starting at `addr`
    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` at `addr`
    ///
    /// The range must already be erased. Page chunking happens inside.
    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase `len` bytes at `addr`, both aligned to the granularity
    async fn erase(&mut self, addr: u32, len: u32) -> Result<()>;

    /// Whether `len` bytes starting at `addr` stay inside the device
    fn in_bounds(&self, addr: u32, len: usize) -> bool {
        // u64 keeps addr + len from wrapping at the 4 GiB boundary
        addr as u64 + len as u64 <= self.size() as u64
    }

    /// Whether some blocks were skipped and want another erase/write pass
    ///
    /// Devices that refuse writes to a region in active use (an EC
    /// executing from the flash it serves) answer true once the first
    /// pass has stepped around that region.
    fn need_second_pass(&self) -> bool {
        false
    }

    /// Move the device so the previously skipped blocks become writable
    async fn start_second_pass(&mut self) -> Result<()> {
        Ok(())
    }

    /// Inspect the image about to be written and get out of its way
    ///
    /// An EC parses the image for its firmware copy locations and parks
    /// execution in a copy that will survive the write. The default does
    /// nothing.
    async fn prepare_write(&mut self, _image: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Restore normal operation after a write
    async fn finish_write(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the protection methods below are usable
    #[cfg(feature = "alloc")]
    fn wp_supported(&self) -> bool {
        false
    }

    /// Current protection mode and range
    #[cfg(feature = "alloc")]
    async fn read_wp_config(&mut self) -> WpResult<WpConfig> {
        Err(WpError::ChipUnsupported)
    }

    /// Change the protection mode, leaving the range alone
    #[cfg(feature = "alloc")]
    async fn set_wp_mode(&mut self, _mode: WpMode, _options: WriteOptions) -> WpResult<()> {
        Err(WpError::ChipUnsupported)
    }

    /// Change the protected range, leaving the mode alone
    #[cfg(feature = "alloc")]
    async fn set_wp_range(&mut self, _range: &WpRange, _options: WriteOptions) -> WpResult<()> {
        Err(WpError::ChipUnsupported)
    }

    /// Turn protection off
    #[cfg(feature = "alloc")]
    async fn disable_wp(&mut self, _options: WriteOptions) -> WpResult<()> {
        Err(WpError::ChipUnsupported)
    }

    /// Every range the device can protect as currently configured
    #[cfg(feature = "alloc")]
    async fn list_wp_ranges(&mut self) -> WpResult<alloc::vec::Vec<WpRange>> {
        Err(WpError::ChipUnsupported)
    }
}

/// Whole-device helpers derived from the trait
#[cfg(feature = "alloc")]
#[maybe_async(AFIT)]
pub trait FlashDeviceExt: FlashDevice {
    /// Read the full contents into a fresh buffer
    async fn read_all(&mut self) -> Result<alloc::vec::Vec<u8>> {
        let size = self.size() as usize;
        let mut buf = alloc::vec![0u8; size];
        self.read(0, &mut buf).await?;
        Ok(buf)
    }

    /// Erase everything
    async fn erase_all(&mut self) -> Result<()> {
        self.erase(0, self.size()).await
    }
}

#[cfg(feature = "alloc")]
impl<D: FlashDevice + ?Sized> FlashDeviceExt for D {}

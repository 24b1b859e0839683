//! [`FlashDevice`] over a raw SPI bus and a probed chip

use crate::chip::{EraseBlock, WriteGranularity};
use crate::error::Result;
use crate::flash::device::FlashDevice;
use crate::flash::operations;
use crate::flash::probed::ProbedChip;
use crate::programmer::SpiBus;
#[cfg(feature = "alloc")]
use crate::wp::{self, WpConfig, WpMode, WpRange, WpResult, WriteOptions};
use maybe_async::maybe_async;

/// A probed SPI chip presented through the device interface
///
/// Owns the bus and the probe result and routes every device call
/// through the JEDEC command layer.
///
/// ```ignore
/// let probed = operations::probe(&mut bus)?;
/// let mut device = SpiFlashDevice::new(bus, probed);
/// let mut buf = [0u8; 4096];
/// device.read(0, &mut buf)?;
/// ```
pub struct SpiFlashDevice<B: SpiBus> {
    bus: B,
    probed: ProbedChip,
}

impl<B: SpiBus> SpiFlashDevice<B> {
    /// Wrap a bus and the chip probed on it
    pub fn new(bus: B, probed: ProbedChip) -> Self {
        Self { bus, probed }
    }

    /// The underlying bus, for protocol work outside the device surface
    pub fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    /// The probe result this device was built from
    pub fn probed(&self) -> &ProbedChip {
        &self.probed
    }
}

#[maybe_async(AFIT)]
impl<B: SpiBus> FlashDevice for SpiFlashDevice<B> {
    fn size(&self) -> u32 {
        self.probed.total_size() as u32
    }

    fn min_erase_size(&self) -> u32 {
        self.probed.chip.min_erase_size()
    }

    fn write_granularity(&self) -> WriteGranularity {
        self.probed.chip.write_granularity
    }

    fn erase_blocks(&self) -> &[EraseBlock] {
        self.probed.chip.erase_blocks
    }

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        operations::read(&mut self.bus, &self.probed, addr, buf).await
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        operations::write(&mut self.bus, &self.probed, addr, data).await
    }

    async fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        operations::erase(&mut self.bus, &self.probed, addr, len).await
    }

    #[cfg(feature = "alloc")]
    fn wp_supported(&self) -> bool {
        self.probed.chip.wp_family.is_some()
    }

    #[cfg(feature = "alloc")]
    async fn read_wp_config(&mut self) -> WpResult<WpConfig> {
        wp::read_config(&mut self.bus, self.probed.chip).await
    }

    #[cfg(feature = "alloc")]
    async fn set_wp_mode(&mut self, mode: WpMode, options: WriteOptions) -> WpResult<()> {
        wp::set_mode(&mut self.bus, self.probed.chip, mode, options).await
    }

    #[cfg(feature = "alloc")]
    async fn set_wp_range(&mut self, range: &WpRange, options: WriteOptions) -> WpResult<()> {
        wp::set_range(&mut self.bus, self.probed.chip, range, options).await
    }

    #[cfg(feature = "alloc")]
    async fn disable_wp(&mut self, options: WriteOptions) -> WpResult<()> {
        wp::disable(&mut self.bus, self.probed.chip, options).await
    }

    #[cfg(feature = "alloc")]
    async fn list_wp_ranges(&mut self) -> WpResult<alloc::vec::Vec<WpRange>> {
        wp::list_ranges(&mut self.bus, self.probed.chip).await
    }
}

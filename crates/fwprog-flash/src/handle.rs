//! One owned handle per opened flash part
//!
//! [`FlashHandle`] type-erases the device behind a `Box<dyn FlashDevice>`
//! so callers never learn whether the programmer speaks SPI or mediates
//! access opaquely. Chip identity travels alongside as an optional
//! [`ChipInfo`]; opaque programmers have none to offer.

use fwprog_core::chip::FlashChip;
use fwprog_core::flash::{FlashDevice, ProbedChip};
use fwprog_core::layout::{fmap_offset, parse_fmap_at, Layout};
use fwprog_core::wp::{WpConfig, WpMode, WpRange, WpResult, WriteOptions};

/// Identity of the part behind a handle
#[derive(Debug, Clone, Copy)]
pub struct ChipInfo {
    /// Vendor name
    pub vendor: &'static str,
    /// Part name
    pub name: &'static str,
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC model ID
    pub model_id: u16,
    /// Array size in bytes
    pub total_size: u32,
    /// Program page size in bytes
    pub page_size: u32,
    /// The full descriptor, when deeper detail is wanted
    pub chip: Option<&'static FlashChip>,
}

impl From<&ProbedChip> for ChipInfo {
    fn from(probed: &ProbedChip) -> Self {
        Self {
            vendor: probed.chip.vendor,
            name: probed.chip.name,
            manufacturer_id: probed.chip.manufacturer_id,
            model_id: probed.chip.model_id,
            total_size: probed.chip.total_size,
            page_size: probed.chip.page_size,
            chip: Some(probed.chip),
        }
    }
}

/// An opened flash part, programmer included
///
/// The handle owns the device and the device owns the programmer, so
/// dropping the handle tears the whole stack down. Command code works
/// against this type alone.
pub struct FlashHandle {
    device: Box<dyn FlashDevice>,
    chip_info: Option<ChipInfo>,
}

impl FlashHandle {
    /// Wrap a device whose chip was probed over SPI
    pub(crate) fn with_chip_info(device: Box<dyn FlashDevice>, chip_info: ChipInfo) -> Self {
        Self {
            device,
            chip_info: Some(chip_info),
        }
    }

    /// Wrap a device that hides the part behind it
    pub(crate) fn without_chip_info(device: Box<dyn FlashDevice>) -> Self {
        Self {
            device,
            chip_info: None,
        }
    }

    /// Identity of the probed part; `None` behind opaque programmers
    pub fn chip_info(&self) -> Option<&ChipInfo> {
        self.chip_info.as_ref()
    }

    /// Array size in bytes
    pub fn size(&self) -> u32 {
        self.device.size()
    }

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Box<dyn std::error::Error>> {
        self.device.read(addr, buf).map_err(Into::into)
    }

    /// Program `data` at `addr` without erasing first
    ///
    /// Callers wanting erase, write and verify as one operation go
    /// through `erase_and_write` on the device instead.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        self.device.write(addr, data).map_err(Into::into)
    }

    /// Erase `len` bytes starting at `addr`
    pub fn erase(&mut self, addr: u32, len: u32) -> Result<(), Box<dyn std::error::Error>> {
        self.device.erase(addr, len).map_err(Into::into)
    }

    /// The device itself, for code written against the trait
    pub fn as_device_mut(&mut self) -> &mut dyn FlashDevice {
        self.device.as_mut()
    }

    /// Whether this part can manage write protection
    pub fn wp_supported(&self) -> bool {
        self.device.wp_supported()
    }

    /// Current protection mode and range
    pub fn read_wp_config(&mut self) -> WpResult<WpConfig> {
        self.device.read_wp_config()
    }

    /// Change the protection mode, keeping the range
    pub fn set_wp_mode(&mut self, mode: WpMode, options: WriteOptions) -> WpResult<()> {
        self.device.set_wp_mode(mode, options)
    }

    /// Change the protected range, keeping the mode
    pub fn set_wp_range(&mut self, range: &WpRange, options: WriteOptions) -> WpResult<()> {
        self.device.set_wp_range(range, options)
    }

    /// Turn protection off entirely
    pub fn disable_wp(&mut self, options: WriteOptions) -> WpResult<()> {
        self.device.disable_wp(options)
    }

    /// Every range this part can protect
    pub fn list_wp_ranges(&mut self) -> WpResult<Vec<WpRange>> {
        self.device.list_wp_ranges()
    }

    /// Pull the layout out of the chip by scanning it for an FMAP
    pub fn read_fmap(&mut self) -> Result<Layout, Box<dyn std::error::Error>> {
        log::debug!("scanning {:#x} bytes of flash for an FMAP", self.size());
        let mut image = vec![0u8; self.size() as usize];
        self.device.read(0, &mut image)?;
        let offset = fmap_offset(&image).ok_or("no FMAP in flash")?;
        let layout = parse_fmap_at(&image, offset)?;
        log::debug!("FMAP at {:#x} holds {} regions", offset, layout.len());
        Ok(layout)
    }
}

//! EC-mediated flash device
//!
//! [`EcDevice`] drives flash behind an EC: chunked reads and writes,
//! whole-span erases, and the copy coordination that makes a full
//! reprogram possible. The EC denies any write touching the copy it is
//! running from, so [`EcDevice::prepare`] parks it in the read-only
//! copy, denied spans are collected during the first pass, and
//! [`EcDevice::start_second_pass`] jumps to a freshly written copy so
//! the skipped spans can be replayed.
//!
//! [`EcFlashDevice`] layers the unified flash interface on top.

use alloc::vec;
use alloc::vec::Vec;

use maybe_async::maybe_async;

use fwprog_core::chip::{EraseBlock, WriteGranularity};
use fwprog_core::error::{Error, Result as CoreResult};
use fwprog_core::flash::{FlashDevice, OpaqueFlashDevice};
use fwprog_core::layout::Layout;
use fwprog_core::programmer::OpaqueProgrammer;
use fwprog_core::wp::{WpConfig, WpError, WpMode, WpRange, WpResult, WriteOptions};

use crate::client::EcClient;
use crate::commands::{
    EcFlashRegion, EcImage, EcStatus, ProtectFlags, RebootCmd, RebootFlags,
};
use crate::error::{EcError, Result};
use crate::session::{EcConfig, EcSession};
use crate::transport::EcTransport;

const WRITE_HEADER_LEN: usize = core::mem::size_of::<crate::commands::FlashWriteParams>();

/// Flash access and copy coordination for one EC
pub struct EcDevice<T> {
    client: EcClient<T>,
    session: EcSession,
    flash_size: u32,
    erase_block_size: u32,
    max_write: usize,
    ro: (u32, u32),
    rw: (u32, u32),
    current: EcImage,
}

#[maybe_async]
impl<T: EcTransport> EcDevice<T> {
    /// Probe for an EC on `transport` and read its flash geometry.
    pub async fn open(transport: T, config: EcConfig) -> Result<Self> {
        let mut client = EcClient::new(transport, config.dev_index).await?;
        let info = client.flash_info().await?;
        let current = client.current_image().await?;
        let ro = client.region_info(EcFlashRegion::Ro).await?;
        let rw = client.region_info(EcFlashRegion::Rw).await?;
        let max_write = client.ideal_write_size().await?;
        log::info!(
            "EC flash: {:#x} bytes, erase block {:#x}, running {}",
            info.flash_size.get(),
            info.erase_block_size.get(),
            current
        );
        Ok(Self {
            client,
            session: EcSession::new(config),
            flash_size: info.flash_size.get(),
            erase_block_size: info.erase_block_size.get(),
            max_write,
            ro,
            rw,
            current,
        })
    }

    pub fn session(&self) -> &EcSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    pub fn erase_block_size(&self) -> u32 {
        self.erase_block_size
    }

    pub fn current_image(&self) -> EcImage {
        self.current
    }

    /// Cache the firmware copy locations from the image about to be
    /// written and park the EC in its read-only copy.
    ///
    /// An image without a flash map carries no copy information; flash
    /// access still works but denied writes cannot be replayed.
    pub async fn prepare(&mut self, image: &[u8]) -> CoreResult<()> {
        self.session.reset();
        let layout = match Layout::from_fmap(image) {
            Ok(layout) => layout,
            Err(_) => {
                log::debug!("no flash map in image, skipping copy bookkeeping");
                return Ok(());
            }
        };
        for (name, kind) in [("EC_RO", EcImage::Ro), ("EC_RW", EcImage::Rw)] {
            if let Some(region) = layout.find_region(name) {
                log::debug!(
                    "found {} copy in image at {:#x}+{:#x}",
                    kind,
                    region.start,
                    region.size
                );
                self.session.set_copy(kind, region.start, region.size);
            }
        }
        self.jump(EcImage::Ro).await
    }

    /// Ask the EC to run another firmware copy. `Unknown` picks a copy
    /// that has not been invalidated, preferring the read-only one.
    pub async fn jump(&mut self, target: EcImage) -> CoreResult<()> {
        // Re-reading the running copy avoids a no-op reboot command,
        // which some ECs answer twice and wedge the transport.
        self.current = self.client.current_image().await?;
        if self.current == target {
            return Ok(());
        }
        let resolved = match target {
            EcImage::Unknown => {
                let fresh = self.session.fresh_target().ok_or(Error::NoValidCopy)?;
                if self.current == fresh {
                    return Ok(());
                }
                fresh
            }
            other => other,
        };
        let cmd = match resolved {
            EcImage::Rw => RebootCmd::JumpRw,
            _ => RebootCmd::JumpRo,
        };
        log::debug!("jumping from {} to {}", self.current, resolved);
        self.client.reboot(cmd, RebootFlags::empty()).await?;
        self.current = resolved;
        // Give the EC a second to reinitialize before the next command.
        self.client.delay_us(1_000_000).await;
        // The other copy may implement a different write geometry.
        match self.client.ideal_write_size().await {
            Ok(size) => self.max_write = size,
            Err(e) => log::warn!("cannot refresh write chunk size after jump: {}", e),
        }
        Ok(())
    }

    /// Jump out of the way so spans denied during the first pass can be
    /// replayed. Fails with `NoValidCopy` when every copy has been
    /// invalidated.
    pub async fn start_second_pass(&mut self) -> CoreResult<()> {
        self.session.begin_second_pass();
        self.jump(EcImage::Unknown).await
    }

    /// Leave the EC in a sensible copy after an update. With
    /// `try_latest_firmware` set this prefers the freshly written
    /// read-write copy; otherwise the EC stays where it is.
    pub async fn finish(&mut self) -> CoreResult<()> {
        if !self.session.config.try_latest_firmware {
            return Ok(());
        }
        let rw_fresh = self
            .session
            .copy(EcImage::Rw)
            .is_some_and(|copy| !copy.stale);
        if rw_fresh && self.jump(EcImage::Rw).await.is_ok() {
            return Ok(());
        }
        self.jump(EcImage::Ro).await
    }

    fn active_region(&self) -> (u32, u32) {
        match self.current {
            EcImage::Rw => self.rw,
            _ => self.ro,
        }
    }

    fn overlaps_active(&self, addr: u32, len: u32) -> bool {
        let (start, size) = self.active_region();
        if len == 0 || size == 0 {
            return false;
        }
        !(addr + len - 1 < start || addr > start + size - 1)
    }

    /// Record a denied span and flag the retry pass.
    fn deny(&mut self, addr: u32, len: u32) -> Error {
        log::warn!(
            "EC denied access to {:#x}+{:#x} (running {}), deferring to second pass",
            addr,
            len,
            self.current
        );
        self.session.invalidate_overlapping(addr, len);
        self.session.request_second_pass();
        Error::AccessDenied
    }

    fn max_read_chunk(&self) -> usize {
        self.client.max_param_len()
    }

    fn max_write_chunk(&self) -> usize {
        self.max_write
            .min(self.client.max_param_len().saturating_sub(WRITE_HEADER_LEN))
            .max(1)
    }
}

#[maybe_async(AFIT)]
impl<T: EcTransport> OpaqueProgrammer for EcDevice<T> {
    fn size(&self) -> usize {
        self.flash_size as usize
    }

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> CoreResult<()> {
        let chunk = self.max_read_chunk();
        for (i, piece) in buf.chunks_mut(chunk).enumerate() {
            let offset = addr + (i * chunk) as u32;
            self.client.flash_read(offset, piece).await?;
        }
        Ok(())
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> CoreResult<()> {
        let chunk = self.max_write_chunk();
        for (i, piece) in data.chunks(chunk).enumerate() {
            let offset = addr + (i * chunk) as u32;
            if self.overlaps_active(offset, piece.len() as u32) {
                return Err(self.deny(addr, data.len() as u32));
            }
            match self.client.flash_write(offset, piece).await {
                Ok(()) => {}
                Err(EcError::Status(EcStatus::AccessDenied)) => {
                    return Err(self.deny(addr, data.len() as u32));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn erase(&mut self, addr: u32, len: u32) -> CoreResult<()> {
        if self.overlaps_active(addr, len) {
            return Err(self.deny(addr, len));
        }
        match self.client.flash_erase(addr, len).await {
            Ok(()) => Ok(()),
            Err(EcError::Status(EcStatus::AccessDenied)) => Err(self.deny(addr, len)),
            Err(e) => Err(e.into()),
        }
    }
}

#[maybe_async]
impl<T: EcTransport> EcDevice<T> {
    /// Current protection state in status-register terms.
    ///
    /// The EC models protection as one latch: either the read-only
    /// region is protected at boot or nothing is. The latch maps to
    /// hardware mode; the range is reported empty unless protection is
    /// active right now.
    pub async fn wp_config(&mut self) -> WpResult<WpConfig> {
        let status = self
            .client
            .flash_protect(ProtectFlags::empty(), ProtectFlags::empty())
            .await
            .map_err(Error::from)?;
        let flags = ProtectFlags::from_bits_truncate(status.flags.get());
        let mode = if flags.contains(ProtectFlags::RO_AT_BOOT) {
            WpMode::Hardware
        } else {
            WpMode::Disabled
        };
        let mut range = if flags.contains(ProtectFlags::RO_AT_BOOT) {
            let (offset, size) = self
                .client
                .region_info(EcFlashRegion::WpRo)
                .await
                .map_err(Error::from)?;
            WpRange::new(offset, size)
        } else {
            WpRange::none()
        };
        if !flags.intersects(ProtectFlags::RO_NOW | ProtectFlags::ALL_NOW) {
            // Latched for next boot but nothing is protected right now.
            range = WpRange::none();
        }
        Ok(WpConfig { mode, range })
    }

    /// The EC can protect exactly one range: its write-protect region.
    /// Anything else is rejected rather than rounded.
    pub async fn set_wp_range(&mut self, range: &WpRange) -> WpResult<()> {
        let (offset, size) = self
            .client
            .region_info(EcFlashRegion::WpRo)
            .await
            .map_err(Error::from)?;
        let supported =
            !range.is_protected() || (range.start == offset && range.len == size);
        if !supported {
            log::error!(
                "unsupported protection range {:#x}+{:#x}; this EC protects nothing or exactly {:#x}+{:#x}",
                range.start,
                range.len,
                offset,
                size
            );
            return Err(WpError::RangeUnsupported);
        }
        self.set_protect(range.is_protected()).await
    }

    pub async fn set_wp_mode(&mut self, mode: WpMode) -> WpResult<()> {
        match mode {
            WpMode::Hardware => self.set_protect(true).await,
            WpMode::Disabled => self.set_protect(false).await,
            _ => Err(WpError::ModeUnsupported),
        }
    }

    pub async fn disable_wp(&mut self) -> WpResult<()> {
        self.set_protect(false).await
    }

    pub async fn list_wp_ranges(&mut self) -> WpResult<Vec<WpRange>> {
        let (offset, size) = self
            .client
            .region_info(EcFlashRegion::WpRo)
            .await
            .map_err(Error::from)?;
        Ok(vec![WpRange::none(), WpRange::new(offset, size)])
    }

    /// Drive the protection latch and make it effective now.
    ///
    /// Asks for RO_AT_BOOT plus RO_NOW first. ECs without RO_NOW fall
    /// back to protecting the whole chip, which also locks the
    /// read-write copy, so a cold reset is arranged for the next AP
    /// shutdown to release it again.
    async fn set_protect(&mut self, enable: bool) -> WpResult<()> {
        let mask = ProtectFlags::RO_AT_BOOT | ProtectFlags::RO_NOW;
        let want = if enable { mask } else { ProtectFlags::empty() };
        self.client
            .flash_protect(mask, want)
            .await
            .map_err(Error::from)?;

        let status = self
            .client
            .flash_protect(ProtectFlags::empty(), ProtectFlags::empty())
            .await
            .map_err(Error::from)?;
        let flags = ProtectFlags::from_bits_truncate(status.flags.get());
        let writable = ProtectFlags::from_bits_truncate(status.writable_flags.get());

        if !enable {
            if flags.contains(ProtectFlags::RO_AT_BOOT) {
                return Err(verify_failed(want, flags));
            }
            if flags.contains(ProtectFlags::RO_NOW) {
                log::error!("protection latch cleared but RO is still protected; cold reset the EC");
                return Err(WpError::UnsupportedState);
            }
            return Ok(());
        }

        if !flags.contains(ProtectFlags::RO_AT_BOOT) {
            return Err(verify_failed(want, flags));
        }
        if flags.contains(ProtectFlags::RO_NOW) {
            return Ok(());
        }
        if writable.contains(ProtectFlags::ALL_NOW) {
            log::warn!("EC lacks RO_NOW, protecting the entire flash instead");
            self.client
                .flash_protect(ProtectFlags::ALL_NOW, ProtectFlags::ALL_NOW)
                .await
                .map_err(Error::from)?;
            let status = self
                .client
                .flash_protect(ProtectFlags::empty(), ProtectFlags::empty())
                .await
                .map_err(Error::from)?;
            let flags = ProtectFlags::from_bits_truncate(status.flags.get());
            if !flags.contains(ProtectFlags::ALL_NOW) {
                log::error!("whole-flash protection did not stick; cold reset the EC");
                return Err(WpError::UnsupportedState);
            }
            // Whole-flash protection also locks the RW copy; release it
            // at the next AP shutdown.
            match self
                .client
                .reboot(RebootCmd::Cold, RebootFlags::ON_AP_SHUTDOWN)
                .await
            {
                Ok(()) => log::debug!("cold reset arranged at next shutdown"),
                Err(e) => log::warn!(
                    "cannot arrange a cold reset to unlock the RW copy: {}",
                    e
                ),
            }
            Ok(())
        } else {
            log::error!("protection latched for next boot but cannot be activated now; cold reset the EC");
            Err(WpError::UnsupportedState)
        }
    }
}

fn verify_failed(expected: ProtectFlags, actual: ProtectFlags) -> WpError {
    WpError::SpiError(Error::ProtectionWriteFailed {
        expected: expected.bits() as u8,
        actual: actual.bits() as u8,
    })
}

/// Unified flash interface over an EC
pub struct EcFlashDevice<T: EcTransport> {
    inner: OpaqueFlashDevice<EcDevice<T>>,
}

#[maybe_async]
impl<T: EcTransport> EcFlashDevice<T> {
    pub async fn open(transport: T, config: EcConfig) -> Result<Self> {
        let device = EcDevice::open(transport, config).await?;
        let erase_block = device.erase_block_size();
        let mut inner = OpaqueFlashDevice::new(device);
        inner.set_erase_block_size(erase_block);
        Ok(Self { inner })
    }

    pub fn device(&mut self) -> &mut EcDevice<T> {
        self.inner.programmer()
    }

    pub fn device_ref(&self) -> &EcDevice<T> {
        self.inner.programmer_ref()
    }

    /// See [`EcDevice::prepare`].
    pub async fn prepare(&mut self, image: &[u8]) -> CoreResult<()> {
        self.inner.programmer().prepare(image).await
    }

    /// See [`EcDevice::finish`].
    pub async fn finish(&mut self) -> CoreResult<()> {
        self.inner.programmer().finish().await
    }
}

#[maybe_async(AFIT)]
impl<T: EcTransport> FlashDevice for EcFlashDevice<T> {
    fn size(&self) -> u32 {
        self.inner.size()
    }

    fn min_erase_size(&self) -> u32 {
        self.inner.min_erase_size()
    }

    fn write_granularity(&self) -> WriteGranularity {
        self.inner.write_granularity()
    }

    fn erase_blocks(&self) -> &[EraseBlock] {
        self.inner.erase_blocks()
    }

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> CoreResult<()> {
        self.inner.read(addr, buf).await
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> CoreResult<()> {
        self.inner.write(addr, data).await
    }

    async fn erase(&mut self, addr: u32, len: u32) -> CoreResult<()> {
        self.inner.erase(addr, len).await
    }

    fn need_second_pass(&self) -> bool {
        self.inner.programmer_ref().session().needs_second_pass()
    }

    async fn start_second_pass(&mut self) -> CoreResult<()> {
        self.inner.programmer().start_second_pass().await
    }

    async fn prepare_write(&mut self, image: &[u8]) -> CoreResult<()> {
        self.inner.programmer().prepare(image).await
    }

    async fn finish_write(&mut self) -> CoreResult<()> {
        self.inner.programmer().finish().await
    }

    fn wp_supported(&self) -> bool {
        true
    }

    async fn read_wp_config(&mut self) -> WpResult<WpConfig> {
        self.inner.programmer().wp_config().await
    }

    async fn set_wp_mode(&mut self, mode: WpMode, _options: WriteOptions) -> WpResult<()> {
        self.inner.programmer().set_wp_mode(mode).await
    }

    async fn set_wp_range(&mut self, range: &WpRange, _options: WriteOptions) -> WpResult<()> {
        self.inner.programmer().set_wp_range(range).await
    }

    async fn disable_wp(&mut self, _options: WriteOptions) -> WpResult<()> {
        self.inner.programmer().disable_wp().await
    }

    async fn list_wp_ranges(&mut self) -> WpResult<Vec<WpRange>> {
        self.inner.programmer().list_wp_ranges().await
    }
}

#[cfg(all(test, feature = "is_sync"))]
mod tests {
    use super::*;
    use crate::mock::MockEc;
    use crate::proto::{self, EcProtocolVersion};
    use fwprog_core::flash::{erase_and_write, FlashDeviceExt};

    const FLASH_SIZE: usize = 0x20000;

    fn put_fmap(image: &mut [u8], at: usize, areas: &[(&str, u32, u32)]) {
        image[at..at + 8].copy_from_slice(b"__FMAP__");
        image[at + 8] = 1;
        image[at + 9] = 0;
        image[at + 10..at + 18].copy_from_slice(&0u64.to_le_bytes());
        let image_len = image.len() as u32;
        image[at + 18..at + 22].copy_from_slice(&image_len.to_le_bytes());
        image[at + 22..at + 26].copy_from_slice(b"EC\0\0");
        image[at + 54..at + 56].copy_from_slice(&(areas.len() as u16).to_le_bytes());

        let mut area = at + 56;
        for (name, offset, size) in areas {
            image[area..area + 4].copy_from_slice(&offset.to_le_bytes());
            image[area + 4..area + 8].copy_from_slice(&size.to_le_bytes());
            image[area + 8..area + 8 + name.len()].copy_from_slice(name.as_bytes());
            image[area + 40..area + 42].copy_from_slice(&0u16.to_le_bytes());
            area += 42;
        }
    }

    fn build_image() -> Vec<u8> {
        let mut image: Vec<u8> = (0..FLASH_SIZE).map(|i| (i % 251) as u8).collect();
        put_fmap(
            &mut image,
            0x7000,
            &[("EC_RO\0", 0x0, 0x10000), ("EC_RW\0", 0x10000, 0x10000)],
        );
        image
    }

    fn open(version: EcProtocolVersion) -> EcFlashDevice<MockEc> {
        EcFlashDevice::open(MockEc::new(version), EcConfig::default()).unwrap()
    }

    #[test]
    fn detects_every_generation() {
        for version in [
            EcProtocolVersion::V0Legacy,
            EcProtocolVersion::V1Args,
            EcProtocolVersion::V3Packet,
        ] {
            let mut transport = MockEc::new(version);
            assert_eq!(proto::detect(&mut transport).unwrap(), version);
        }
    }

    #[test]
    fn open_reads_geometry() {
        let device = open(EcProtocolVersion::V3Packet);
        assert_eq!(device.size(), FLASH_SIZE as u32);
        assert_eq!(device.min_erase_size(), 0x1000);
        assert_eq!(device.device_ref().current_image(), EcImage::Ro);
    }

    #[test]
    fn reads_writes_and_erases_outside_the_active_copy() {
        let mut device = open(EcProtocolVersion::V1Args);
        device.erase(0x10000, 0x1000).unwrap();
        device.write(0x10000, &[0xaa; 0x300]).unwrap();
        let mut buf = [0u8; 0x300];
        device.read(0x10000, &mut buf).unwrap();
        assert_eq!(buf, [0xaa; 0x300]);
    }

    #[test]
    fn active_copy_write_defers_to_second_pass() {
        let mut device = open(EcProtocolVersion::V3Packet);
        let image = build_image();
        device.prepare(&image).unwrap();
        assert_eq!(device.device_ref().current_image(), EcImage::Ro);

        assert_eq!(device.write(0x100, &[0u8; 16]), Err(Error::AccessDenied));
        assert!(device.need_second_pass());

        // The read-only copy is now stale, so the jump lands in RW.
        device.start_second_pass().unwrap();
        assert_eq!(device.device_ref().current_image(), EcImage::Rw);
        assert!(!device.need_second_pass());
        device.write(0x100, &[0u8; 16]).unwrap();
    }

    #[test]
    fn second_pass_fails_without_a_fresh_copy() {
        let mut device = open(EcProtocolVersion::V3Packet);
        let image = build_image();
        device.prepare(&image).unwrap();

        let _ = device.write(0x100, &[0u8; 16]);
        let _ = device.write(0x10100, &[0u8; 16]);
        // Second write succeeded (RW is not active), so only RO is stale.
        device.start_second_pass().unwrap();

        // Now running RW with RO already stale; denying RW leaves nothing.
        let _ = device.write(0x10200, &[0u8; 16]);
        assert_eq!(device.start_second_pass(), Err(Error::NoValidCopy));
    }

    #[test]
    fn full_reprogram_takes_two_passes() {
        let mut device = open(EcProtocolVersion::V1Args);
        let image = build_image();
        device.prepare(&image).unwrap();

        let stats = erase_and_write(&mut device, 0, &image).unwrap();
        assert_eq!(stats.passes, 2);
        assert_eq!(device.read_all().unwrap(), image);
        // Pass two ran from the freshly written read-write copy.
        assert_eq!(device.device_ref().current_image(), EcImage::Rw);
    }

    #[test]
    fn prepare_without_fmap_still_allows_access() {
        let mut device = open(EcProtocolVersion::V0Legacy);
        let image = vec![0x5a; FLASH_SIZE];
        device.prepare(&image).unwrap();
        device.write(0x10000, &[0x5a; 0x10]).unwrap();
        // Denied spans cannot be replayed without copy information.
        assert_eq!(device.write(0x0, &[0x5a; 0x10]), Err(Error::AccessDenied));
        assert_eq!(device.start_second_pass(), Err(Error::NoValidCopy));
    }

    #[test]
    fn finish_prefers_the_fresh_rw_copy() {
        let transport = MockEc::new(EcProtocolVersion::V3Packet);
        let config = EcConfig {
            try_latest_firmware: true,
            ..EcConfig::default()
        };
        let mut device = EcFlashDevice::open(transport, config).unwrap();
        let image = build_image();
        device.prepare(&image).unwrap();
        device.finish().unwrap();
        assert_eq!(device.device_ref().current_image(), EcImage::Rw);
    }

    #[test]
    fn wp_enable_with_ro_now() {
        let mut device = open(EcProtocolVersion::V3Packet);
        device
            .set_wp_range(&WpRange::new(0x0, 0x10000), WriteOptions::default())
            .unwrap();

        let config = device.read_wp_config().unwrap();
        assert_eq!(config.mode, WpMode::Hardware);
        assert_eq!(config.range, WpRange::new(0x0, 0x10000));

        device.disable_wp(WriteOptions::default()).unwrap();
        let config = device.read_wp_config().unwrap();
        assert_eq!(config.mode, WpMode::Disabled);
        assert_eq!(config.range, WpRange::none());
    }

    #[test]
    fn wp_enable_falls_back_to_whole_flash() {
        let mut transport = MockEc::new(EcProtocolVersion::V3Packet);
        transport.supports_ro_now = false;
        let mut device = EcFlashDevice::open(transport, EcConfig::default()).unwrap();

        device
            .set_wp_mode(WpMode::Hardware, WriteOptions::default())
            .unwrap();
        let config = device.read_wp_config().unwrap();
        assert_eq!(config.mode, WpMode::Hardware);

        // The whole-flash fallback arranges a cold reset for later.
        let ec = flatten(&device);
        assert!(ec.protect.contains(ProtectFlags::ALL_NOW));
        assert!(ec.cold_reset_scheduled);
    }

    #[test]
    fn wp_rejects_arbitrary_ranges() {
        let mut device = open(EcProtocolVersion::V3Packet);
        assert_eq!(
            device.set_wp_range(&WpRange::new(0x0, 0x4000), WriteOptions::default()),
            Err(WpError::RangeUnsupported)
        );
        assert_eq!(
            device.set_wp_mode(WpMode::Permanent, WriteOptions::default()),
            Err(WpError::ModeUnsupported)
        );
    }

    #[test]
    fn lists_the_two_supported_ranges() {
        let mut device = open(EcProtocolVersion::V1Args);
        let ranges = device.list_wp_ranges().unwrap();
        assert_eq!(ranges, vec![WpRange::none(), WpRange::new(0x0, 0x10000)]);
    }

    #[test]
    fn jump_waits_for_reinit() {
        let mut device = open(EcProtocolVersion::V3Packet);
        device.device().jump(EcImage::Rw).unwrap();
        let ec = flatten(&device);
        assert_eq!(ec.jumps, vec![EcImage::Rw]);
        assert!(ec.slept_us >= 1_000_000);
    }

    fn flatten(device: &EcFlashDevice<MockEc>) -> &MockEc {
        device.device_ref().transport()
    }
}

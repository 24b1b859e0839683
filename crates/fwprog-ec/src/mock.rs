//! In-memory EC emulator
//!
//! Implements [`EcTransport`] over a simulated EC: a flash array, two
//! firmware copies, the protection latch and the reboot commands. The
//! emulator speaks exactly one protocol generation and rejects frames
//! in any other framing, which exercises the same fallback path a real
//! probe takes. Used by the crate's own tests and available as an
//! emulated target for higher layers.

use alloc::vec;
use alloc::vec::Vec;

use maybe_async::maybe_async;
use zerocopy::{FromBytes, IntoBytes};

use crate::commands::*;
use crate::error::{EcError, Result};
use crate::proto::{self, EcProtocolVersion};
use crate::transport::EcTransport;

const DEFAULT_FLASH_SIZE: usize = 0x20000;
const DEFAULT_ERASE_BLOCK: u32 = 0x1000;

/// Simulated EC behind a transport
pub struct MockEc {
    version: EcProtocolVersion,
    dev_index: u8,
    pub flash: Vec<u8>,
    pub erase_block: u32,
    pub ro: (u32, u32),
    pub rw: (u32, u32),
    pub wp_ro: (u32, u32),
    pub current: EcImage,
    pub protect: ProtectFlags,
    /// Whether the simulated EC can protect the RO region immediately.
    /// Without it, enabling protection has to fall back to locking the
    /// whole flash.
    pub supports_ro_now: bool,
    pub write_ideal: u32,
    /// Jump targets observed, in order.
    pub jumps: Vec<EcImage>,
    pub cold_reset_scheduled: bool,
    pub slept_us: u64,
}

impl MockEc {
    pub fn new(version: EcProtocolVersion) -> Self {
        Self {
            version,
            dev_index: 0,
            flash: vec![0xff; DEFAULT_FLASH_SIZE],
            erase_block: DEFAULT_ERASE_BLOCK,
            ro: (0x0, 0x10000),
            rw: (0x10000, 0x10000),
            wp_ro: (0x0, 0x10000),
            current: EcImage::Ro,
            protect: ProtectFlags::empty(),
            supports_ro_now: true,
            write_ideal: 0x80,
            jumps: Vec::new(),
            cold_reset_scheduled: false,
            slept_us: 0,
        }
    }

    pub fn with_dev_index(mut self, dev_index: u8) -> Self {
        self.dev_index = dev_index;
        self
    }

    fn region(&self, image: EcImage) -> (u32, u32) {
        match image {
            EcImage::Rw => self.rw,
            _ => self.ro,
        }
    }

    fn overlaps_current(&self, offset: u32, size: u32) -> bool {
        let (start, len) = self.region(self.current);
        size != 0 && !(offset + size - 1 < start || offset > start + len - 1)
    }

    fn protected_now(&self, offset: u32, size: u32) -> bool {
        if self.protect.contains(ProtectFlags::ALL_NOW) {
            return true;
        }
        if self.protect.contains(ProtectFlags::RO_NOW) {
            let (start, len) = self.wp_ro;
            return size != 0 && !(offset + size - 1 < start || offset > start + len - 1);
        }
        false
    }

    fn writable_flags(&self) -> ProtectFlags {
        let mut flags = ProtectFlags::RO_AT_BOOT | ProtectFlags::ALL_NOW;
        if self.supports_ro_now {
            flags |= ProtectFlags::RO_NOW;
        }
        flags
    }

    fn span(&self, offset: u32, size: u32) -> core::result::Result<core::ops::Range<usize>, EcStatus> {
        let start = offset as usize;
        let end = start.checked_add(size as usize).ok_or(EcStatus::InvalidParam)?;
        if end > self.flash.len() {
            return Err(EcStatus::InvalidParam);
        }
        Ok(start..end)
    }

    fn handle(&mut self, command: u16, version: u8, data: &[u8]) -> (EcStatus, Vec<u8>) {
        match self.dispatch(command, version, data) {
            Ok(response) => (EcStatus::Success, response),
            Err(status) => (status, Vec::new()),
        }
    }

    fn dispatch(
        &mut self,
        command: u16,
        version: u8,
        data: &[u8],
    ) -> core::result::Result<Vec<u8>, EcStatus> {
        match command {
            CMD_HELLO => {
                let params =
                    HelloParams::read_from_bytes(data).map_err(|_| EcStatus::InvalidParam)?;
                let response = HelloResponse {
                    out_data: params.in_data.get().wrapping_add(HELLO_DELTA).into(),
                };
                Ok(response.as_bytes().to_vec())
            }
            CMD_GET_VERSION => {
                let response = GetVersionResponse {
                    version_string_ro: *b"mock_v1.0.0-ro\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
                    version_string_rw: *b"mock_v1.0.0-rw\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
                    reserved: [0; 32],
                    current_image: (self.current as u32).into(),
                };
                Ok(response.as_bytes().to_vec())
            }
            CMD_GET_CMD_VERSIONS => {
                let params = GetCmdVersionsParams::read_from_bytes(data)
                    .map_err(|_| EcStatus::InvalidParam)?;
                let mask: u32 = match u16::from(params.cmd) {
                    CMD_FLASH_INFO => 0b11,
                    CMD_FLASH_WRITE => 0b11,
                    CMD_FLASH_PROTECT => 0b10,
                    _ => 0b01,
                };
                let response = GetCmdVersionsResponse {
                    version_mask: mask.into(),
                };
                Ok(response.as_bytes().to_vec())
            }
            CMD_FLASH_INFO => {
                if version == 0 {
                    let response = FlashInfoResponse {
                        flash_size: (self.flash.len() as u32).into(),
                        write_block_size: 4.into(),
                        erase_block_size: self.erase_block.into(),
                        protect_block_size: self.erase_block.into(),
                    };
                    Ok(response.as_bytes().to_vec())
                } else {
                    let response = FlashInfo1Response {
                        flash_size: (self.flash.len() as u32).into(),
                        write_block_size: 4.into(),
                        erase_block_size: self.erase_block.into(),
                        protect_block_size: self.erase_block.into(),
                        write_ideal_size: self.write_ideal.into(),
                        flags: 0.into(),
                    };
                    Ok(response.as_bytes().to_vec())
                }
            }
            CMD_FLASH_REGION_INFO => {
                let params = FlashRegionInfoParams::read_from_bytes(data)
                    .map_err(|_| EcStatus::InvalidParam)?;
                let (offset, size) = match params.region.get() {
                    0 => self.ro,
                    1 => self.rw,
                    2 => self.wp_ro,
                    _ => return Err(EcStatus::InvalidParam),
                };
                let response = FlashRegionInfoResponse {
                    offset: offset.into(),
                    size: size.into(),
                };
                Ok(response.as_bytes().to_vec())
            }
            CMD_FLASH_READ => {
                let params =
                    FlashReadParams::read_from_bytes(data).map_err(|_| EcStatus::InvalidParam)?;
                let span = self.span(params.offset.get(), params.size.get())?;
                Ok(self.flash[span].to_vec())
            }
            CMD_FLASH_WRITE => {
                let header = core::mem::size_of::<FlashWriteParams>();
                if data.len() < header {
                    return Err(EcStatus::InvalidParam);
                }
                let params = FlashWriteParams::read_from_bytes(&data[..header])
                    .map_err(|_| EcStatus::InvalidParam)?;
                let payload = &data[header..];
                if payload.len() != params.size.get() as usize {
                    return Err(EcStatus::InvalidParam);
                }
                let (offset, size) = (params.offset.get(), params.size.get());
                if self.overlaps_current(offset, size) || self.protected_now(offset, size) {
                    return Err(EcStatus::AccessDenied);
                }
                let span = self.span(offset, size)?;
                self.flash[span].copy_from_slice(payload);
                Ok(Vec::new())
            }
            CMD_FLASH_ERASE => {
                let params =
                    FlashEraseParams::read_from_bytes(data).map_err(|_| EcStatus::InvalidParam)?;
                let (offset, size) = (params.offset.get(), params.size.get());
                if self.overlaps_current(offset, size) || self.protected_now(offset, size) {
                    return Err(EcStatus::AccessDenied);
                }
                let span = self.span(offset, size)?;
                self.flash[span].fill(0xff);
                Ok(Vec::new())
            }
            CMD_FLASH_PROTECT => {
                if version != VER_FLASH_PROTECT_1 {
                    return Err(EcStatus::InvalidVersion);
                }
                let params = FlashProtectParams::read_from_bytes(data)
                    .map_err(|_| EcStatus::InvalidParam)?;
                let mask = ProtectFlags::from_bits_truncate(params.mask.get())
                    & self.writable_flags();
                let flags = ProtectFlags::from_bits_truncate(params.flags.get());
                self.protect = (self.protect & !mask) | (flags & mask);
                if !self.protect.contains(ProtectFlags::RO_AT_BOOT) {
                    // A cooperative EC releases active protection with
                    // the latch.
                    self.protect -= ProtectFlags::RO_NOW | ProtectFlags::ALL_NOW;
                }
                let response = FlashProtectResponse {
                    flags: self.protect.bits().into(),
                    valid_flags: ProtectFlags::all().bits().into(),
                    writable_flags: self.writable_flags().bits().into(),
                };
                Ok(response.as_bytes().to_vec())
            }
            CMD_REBOOT_EC => {
                let params =
                    RebootParams::read_from_bytes(data).map_err(|_| EcStatus::InvalidParam)?;
                let flags = RebootFlags::from_bits_truncate(params.flags);
                match params.cmd {
                    c if c == RebootCmd::JumpRo as u8 => {
                        self.current = EcImage::Ro;
                        self.jumps.push(EcImage::Ro);
                        Ok(Vec::new())
                    }
                    c if c == RebootCmd::JumpRw as u8 => {
                        self.current = EcImage::Rw;
                        self.jumps.push(EcImage::Rw);
                        Ok(Vec::new())
                    }
                    c if c == RebootCmd::Cold as u8 => {
                        if flags.contains(RebootFlags::ON_AP_SHUTDOWN) {
                            self.cold_reset_scheduled = true;
                        } else {
                            self.protect -= ProtectFlags::ALL_NOW;
                        }
                        Ok(Vec::new())
                    }
                    c if c == RebootCmd::Cancel as u8 => Ok(Vec::new()),
                    _ => Err(EcStatus::InvalidParam),
                }
            }
            _ => Err(EcStatus::InvalidCommand),
        }
    }
}

#[maybe_async(AFIT)]
impl EcTransport for MockEc {
    async fn exchange(&mut self, request: &[u8], response: &mut [u8]) -> Result<usize> {
        let (command, version, data) = proto::decode_request(self.version, request)?;
        let offset = dev_command_offset(self.dev_index);
        if command & 0xc000 != offset {
            return Ok(write_frame(
                proto::encode_response(self.version, command, EcStatus::InvalidCommand, &[]),
                response,
            ));
        }
        let command = command & !offset;
        let (status, payload) = self.handle(command, version, data);
        let frame = proto::encode_response(self.version, command, status, &payload);
        Ok(write_frame(frame, response))
    }

    async fn delay_us(&mut self, us: u32) {
        self.slept_us += u64::from(us);
    }
}

fn write_frame(frame: Vec<u8>, response: &mut [u8]) -> usize {
    let len = frame.len().min(response.len());
    response[..len].copy_from_slice(&frame[..len]);
    len
}

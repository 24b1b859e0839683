//! EC host command set
//!
//! Command numbers, status codes and wire-level parameter structures for
//! the subset of the host command interface the flash tooling uses. All
//! multi-byte fields are little-endian on the wire; the structures below
//! use explicit little-endian integer types so they can be serialized
//! by reinterpretation on any host.

use core::fmt;

use bitflags::bitflags;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Hello. Test command with a fixed arithmetic answer.
pub const CMD_HELLO: u16 = 0x01;
/// Get version strings and the currently running copy.
pub const CMD_GET_VERSION: u16 = 0x02;
/// Get the supported command-version bitmask for one command.
pub const CMD_GET_CMD_VERSIONS: u16 = 0x08;
/// Flash geometry.
pub const CMD_FLASH_INFO: u16 = 0x10;
/// Read a span of flash.
pub const CMD_FLASH_READ: u16 = 0x11;
/// Program a span of flash.
pub const CMD_FLASH_WRITE: u16 = 0x12;
/// Erase a span of flash.
pub const CMD_FLASH_ERASE: u16 = 0x13;
/// Query or change flash protection flags.
pub const CMD_FLASH_PROTECT: u16 = 0x15;
/// Offset and size of a named flash region.
pub const CMD_FLASH_REGION_INFO: u16 = 0x16;
/// Reboot or jump to another firmware copy.
pub const CMD_REBOOT_EC: u16 = 0xd2;

/// Command version carrying `FlashInfo1Response`.
pub const VER_FLASH_INFO_1: u8 = 1;
/// Command version whose write path honors `write_ideal_size`.
pub const VER_FLASH_WRITE_1: u8 = 1;
/// Command version taking a protection flag mask.
pub const VER_FLASH_PROTECT_1: u8 = 1;

/// Largest payload a version-0 flash write can carry. The legacy
/// parameter block is fixed at 0xfc bytes and the header eats 8 of them.
pub const FLASH_WRITE_V0_SIZE: usize = 0xfc - 8;

/// Commands for a secondary EC on the same transport are offset into a
/// private number range.
pub const fn dev_command_offset(dev_index: u8) -> u16 {
    (dev_index as u16) << 14
}

/// Status code in every EC response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EcStatus {
    Success = 0,
    InvalidCommand = 1,
    Error = 2,
    InvalidParam = 3,
    AccessDenied = 4,
    InvalidResponse = 5,
    InvalidVersion = 6,
    InvalidChecksum = 7,
    InProgress = 8,
    Unavailable = 9,
    Timeout = 10,
    Overflow = 11,
    InvalidHeader = 12,
    RequestTruncated = 13,
    ResponseTooBig = 14,
    BusError = 15,
    Busy = 16,
}

impl EcStatus {
    pub fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            0 => Self::Success,
            1 => Self::InvalidCommand,
            2 => Self::Error,
            3 => Self::InvalidParam,
            4 => Self::AccessDenied,
            5 => Self::InvalidResponse,
            6 => Self::InvalidVersion,
            7 => Self::InvalidChecksum,
            8 => Self::InProgress,
            9 => Self::Unavailable,
            10 => Self::Timeout,
            11 => Self::Overflow,
            12 => Self::InvalidHeader,
            13 => Self::RequestTruncated,
            14 => Self::ResponseTooBig,
            15 => Self::BusError,
            16 => Self::Busy,
            _ => return None,
        })
    }
}

impl fmt::Display for EcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::InvalidCommand => "invalid command",
            Self::Error => "error",
            Self::InvalidParam => "invalid parameter",
            Self::AccessDenied => "access denied",
            Self::InvalidResponse => "invalid response",
            Self::InvalidVersion => "invalid version",
            Self::InvalidChecksum => "invalid checksum",
            Self::InProgress => "in progress",
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::Overflow => "overflow",
            Self::InvalidHeader => "invalid header",
            Self::RequestTruncated => "request truncated",
            Self::ResponseTooBig => "response too big",
            Self::BusError => "bus error",
            Self::Busy => "busy",
        };
        write!(f, "{} ({})", name, *self as u16)
    }
}

/// Firmware copy identifiers as the EC reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EcImage {
    Unknown = 0,
    Ro = 1,
    Rw = 2,
}

impl EcImage {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Ro,
            2 => Self::Rw,
            _ => Self::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Ro => "RO",
            Self::Rw => "RW",
        }
    }
}

impl fmt::Display for EcImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Region selectors for `CMD_FLASH_REGION_INFO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EcFlashRegion {
    Ro = 0,
    Rw = 1,
    WpRo = 2,
}

/// Reboot subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RebootCmd {
    Cancel = 0,
    JumpRo = 1,
    JumpRw = 2,
    Cold = 4,
    DisableJump = 5,
    Hibernate = 6,
}

bitflags! {
    /// Modifier flags for `CMD_REBOOT_EC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RebootFlags: u8 {
        /// Defer the reboot until the AP shuts down.
        const ON_AP_SHUTDOWN = 1 << 1;
    }
}

bitflags! {
    /// Flash protection state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProtectFlags: u32 {
        /// RO region is protected at boot.
        const RO_AT_BOOT = 1 << 0;
        /// RO region is protected right now.
        const RO_NOW = 1 << 1;
        /// Entire flash is protected right now.
        const ALL_NOW = 1 << 2;
        /// The hardware write-protect pin is asserted.
        const GPIO_ASSERTED = 1 << 3;
        /// Protection could not be released.
        const ERROR_STUCK = 1 << 4;
        /// Protection is inconsistent with the requested state.
        const ERROR_INCONSISTENT = 1 << 5;
        /// Entire flash is protected at boot.
        const ALL_AT_BOOT = 1 << 6;
    }
}

/// Magic sent in a hello request
pub const HELLO_MAGIC: u32 = 0xf0e0_d0c0;
/// Fixed delta a healthy EC adds to the hello magic
pub const HELLO_DELTA: u32 = 0x0102_0304;

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct HelloParams {
    pub in_data: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct HelloResponse {
    pub out_data: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct GetVersionResponse {
    pub version_string_ro: [u8; 32],
    pub version_string_rw: [u8; 32],
    pub reserved: [u8; 32],
    pub current_image: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct GetCmdVersionsParams {
    pub cmd: u8,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct GetCmdVersionsResponse {
    pub version_mask: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashInfoResponse {
    pub flash_size: U32,
    pub write_block_size: U32,
    pub erase_block_size: U32,
    pub protect_block_size: U32,
}

/// Version-1 geometry adds the preferred write chunk size.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashInfo1Response {
    pub flash_size: U32,
    pub write_block_size: U32,
    pub erase_block_size: U32,
    pub protect_block_size: U32,
    pub write_ideal_size: U32,
    pub flags: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashReadParams {
    pub offset: U32,
    pub size: U32,
}

/// Write parameters; the payload follows the header in the same frame.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashWriteParams {
    pub offset: U32,
    pub size: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashEraseParams {
    pub offset: U32,
    pub size: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashProtectParams {
    /// Bits to change.
    pub mask: U32,
    /// New values for the masked bits.
    pub flags: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashProtectResponse {
    pub flags: U32,
    pub valid_flags: U32,
    pub writable_flags: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashRegionInfoParams {
    pub region: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct FlashRegionInfoResponse {
    pub offset: U32,
    pub size: U32,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RebootParams {
    pub cmd: u8,
    pub flags: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_struct_sizes() {
        assert_eq!(core::mem::size_of::<HelloParams>(), 4);
        assert_eq!(core::mem::size_of::<GetVersionResponse>(), 100);
        assert_eq!(core::mem::size_of::<FlashInfoResponse>(), 16);
        assert_eq!(core::mem::size_of::<FlashInfo1Response>(), 24);
        assert_eq!(core::mem::size_of::<FlashProtectResponse>(), 12);
        assert_eq!(core::mem::size_of::<RebootParams>(), 2);
    }

    #[test]
    fn little_endian_layout() {
        let params = FlashReadParams {
            offset: U32::new(0x0001_0000),
            size: U32::new(0x40),
        };
        assert_eq!(params.as_bytes(), &[0, 0, 1, 0, 0x40, 0, 0, 0]);
    }

    #[test]
    fn status_round_trip() {
        assert_eq!(EcStatus::from_raw(4), Some(EcStatus::AccessDenied));
        assert_eq!(EcStatus::from_raw(16), Some(EcStatus::Busy));
        assert_eq!(EcStatus::from_raw(17), None);
    }

    #[test]
    fn image_from_raw() {
        assert_eq!(EcImage::from_raw(1), EcImage::Ro);
        assert_eq!(EcImage::from_raw(2), EcImage::Rw);
        assert_eq!(EcImage::from_raw(99), EcImage::Unknown);
    }

    #[test]
    fn dev_offset() {
        assert_eq!(dev_command_offset(0), 0);
        assert_eq!(dev_command_offset(1), 0x4000);
        assert_eq!(dev_command_offset(3), 0xc000);
    }
}

//! Flash chip descriptor types

use super::Features;

/// Well-known JEDEC manufacturer IDs
pub mod manufacturer {
    /// AMD / Spansion / Cypress
    pub const SPANSION: u8 = 0x01;
    /// AMIC Technology
    pub const AMIC: u8 = 0x37;
    /// Eon Silicon Devices
    pub const EON: u8 = 0x1C;
    /// GigaDevice
    pub const GIGADEVICE: u8 = 0xC8;
    /// Macronix
    pub const MACRONIX: u8 = 0xC2;
    /// Micron / Numonyx / ST
    pub const ST: u8 = 0x20;
    /// Winbond
    pub const WINBOND: u8 = 0xEF;
}

/// A single erase method supported by a chip: one opcode, one block size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct EraseBlock {
    /// Erase opcode (3-byte address form)
    pub opcode: u8,
    /// Size of the block this opcode erases, in bytes
    pub size: u32,
}

impl EraseBlock {
    /// Create a new erase block descriptor
    pub const fn new(opcode: u8, size: u32) -> Self {
        Self { opcode, size }
    }
}

/// Write granularity of a chip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub enum WriteGranularity {
    /// Individual bits can be cleared
    Bit,
    /// Individual bytes can be written
    Byte,
    /// Writes happen through a page buffer
    #[default]
    Page,
}

/// Write protection family tag
///
/// Selects the status register layout and block protection range table
/// that apply to a chip. Chips sharing a tag decode their BP bits the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub enum WpFamily {
    /// Winbond W25Q16
    W25q16,
    /// Winbond W25Q32
    W25q32,
    /// Winbond W25Q64
    W25q64,
    /// Winbond W25Q80
    W25q80,
    /// Winbond W25Q128 (CMP selects the complement table)
    W25q128,
    /// GigaDevice GD25Q32 (CMP selects the complement table)
    Gd25q32,
    /// GigaDevice GD25Q128 (CMP selects the complement table)
    Gd25q128,
    /// Macronix MX25L6406E
    Mx25l6406e,
    /// Macronix MX25L6495F (T/B read from the configuration register)
    Mx25l6495f,
    /// Eon EN25F40
    En25f40,
    /// Eon EN25Q64
    En25q64,
    /// Numonyx N25Q064
    N25q064,
    /// AMIC A25L040
    A25l040,
    /// Spansion S25FS128S
    S25fs128s,
    /// Spansion S25FL256S
    S25fl256s,
}

/// Description of a flash chip
///
/// All fields are `'static`: the database is compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct FlashChip {
    /// Vendor name
    pub vendor: &'static str,
    /// Chip model name
    pub name: &'static str,
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID (two bytes, big-endian as read from READ_JEDEC_ID)
    pub model_id: u16,
    /// Total size in bytes
    pub total_size: u32,
    /// Page size in bytes for page program
    pub page_size: u32,
    /// Supported erase methods, smallest block first
    pub erase_blocks: &'static [EraseBlock],
    /// Write granularity
    pub write_granularity: WriteGranularity,
    /// Feature flags
    pub features: Features,
    /// Write protection family, if the chip's protection scheme is known
    pub wp_family: Option<WpFamily>,
}

impl FlashChip {
    /// Returns the JEDEC ID as (manufacturer, device)
    pub const fn jedec_id(&self) -> (u8, u16) {
        (self.manufacturer_id, self.model_id)
    }

    /// Check whether a probed JEDEC ID matches this chip
    pub const fn matches_jedec_id(&self, manufacturer: u8, device: u16) -> bool {
        self.manufacturer_id == manufacturer && self.model_id == device
    }

    /// True if the chip needs 4-byte addressing to reach all of its cells
    pub const fn requires_4byte_addr(&self) -> bool {
        self.total_size > 16 * 1024 * 1024
    }

    /// Smallest erase block size available
    pub fn min_erase_size(&self) -> u32 {
        self.erase_blocks
            .iter()
            .map(|b| b.size)
            .min()
            .unwrap_or(self.total_size)
    }

    /// Largest erase block usable for an aligned region of `len` at `addr`
    pub fn erase_block_for(&self, addr: u32, len: u32) -> Option<EraseBlock> {
        self.erase_blocks
            .iter()
            .filter(|b| addr % b.size == 0 && b.size <= len)
            .max_by_key(|b| b.size)
            .copied()
    }

    /// Check whether `addr..addr+len` is aligned to some erase block size
    pub fn is_erase_aligned(&self, addr: u32, len: u32) -> bool {
        self.erase_blocks
            .iter()
            .any(|b| addr % b.size == 0 && len % b.size == 0)
    }
}

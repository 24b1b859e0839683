//! Protection range tables
//!
//! Each supported chip family gets a table mapping status register bit
//! patterns to the flash range they protect. Tables are matched in
//! declaration order and the first matching row wins, in both the
//! decode and encode direction. Some families publish two tables and
//! select between them with a register bit (CMP on Winbond and
//! GigaDevice, T/B in the Macronix configuration register).

use maybe_async::maybe_async;

use crate::chip::WpFamily;
use crate::error::Result;
use crate::programmer::SpiBus;
use crate::protocol;
use crate::spi::opcodes;

use super::codec::{SrLayout, StatusSnapshot, WINBOND_LAYOUT};
use super::types::BitState;
use super::types::BitState::{Any, Off, On};

const KIB: u32 = 1024;
const MIB: u32 = 1024 * 1024;

/// One row of a range table
#[derive(Debug, Clone, Copy)]
pub struct RangeEntry {
    /// Required SEC bit state
    pub sec: BitState,
    /// Required TB (or modifier) bit state
    pub tb: BitState,
    /// Block-protect field value
    pub bp: u8,
    /// Start of the protected range
    pub start: u32,
    /// Length of the protected range in bytes
    pub len: u32,
}

const fn row(sec: BitState, tb: BitState, bp: u8, start: u32, len: u32) -> RangeEntry {
    RangeEntry {
        sec,
        tb,
        bp,
        start,
        len,
    }
}

/// Row matched on the block-protect field alone
const fn bp_row(bp: u8, start: u32, len: u32) -> RangeEntry {
    row(Any, Any, bp, start, len)
}

/// How rows of a table are matched against the status bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStyle {
    /// Match the BP field together with the SEC and TB bits of SR1
    SecTb,
    /// Match the BP field alone, optionally gated by an SR2 modifier bit
    Bp,
}

/// How the active table is chosen
#[derive(Debug, Clone, Copy)]
pub enum TableSelect {
    /// A single table
    Fixed(&'static [RangeEntry]),
    /// The SR2 CMP bit picks one of two tables
    Cmp {
        cmp0: &'static [RangeEntry],
        cmp1: &'static [RangeEntry],
    },
    /// The configuration register T/B bit picks one of two tables
    ConfigTb {
        tb0: &'static [RangeEntry],
        tb1: &'static [RangeEntry],
    },
}

/// Protection description for a chip family
#[derive(Debug, Clone, Copy)]
pub struct FamilyDef {
    /// Bit positions within SR1
    pub layout: SrLayout,
    /// Row matching style
    pub style: MatchStyle,
    /// Table selection
    pub select: TableSelect,
    /// SR2 bit consulted when matching `Bp` style rows
    pub modifier_bit: Option<u8>,
    /// Whether the chip has a second status register
    pub has_sr2: bool,
}

impl FamilyDef {
    /// Bits of SR1 that participate in write protection
    pub const fn sr1_mask(&self) -> u8 {
        self.layout.bp_mask() | self.layout.srp_mask()
    }

    /// Bits of SR2 that participate in write protection
    pub const fn sr2_mask(&self) -> u8 {
        let mut mask = 0;
        if self.has_sr2 {
            mask |= opcodes::SR2_SRP1;
        }
        match self.modifier_bit {
            Some(bit) => mask | (1 << bit),
            None => mask,
        }
    }
}

/// Fetch the active range table for a family
///
/// Reads the configuration register when the family selects its table
/// from there, otherwise decides from the snapshot alone.
#[maybe_async]
pub async fn select_table<B: SpiBus + ?Sized>(
    bus: &mut B,
    def: &FamilyDef,
    snap: &StatusSnapshot,
) -> Result<&'static [RangeEntry]> {
    match def.select {
        TableSelect::Fixed(table) => Ok(table),
        TableSelect::Cmp { cmp0, cmp1 } => Ok(if snap.cmp() { cmp1 } else { cmp0 }),
        TableSelect::ConfigTb { tb0, tb1 } => {
            let cfg = protocol::read_status(bus, protocol::StatusReg::Cfg).await?;
            Ok(if cfg & (1 << 3) != 0 { tb1 } else { tb0 })
        }
    }
}

/// Look up the protection description for a chip family
pub const fn family_def(family: WpFamily) -> FamilyDef {
    match family {
        WpFamily::W25q16 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(W25Q16_RANGES),
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::W25q32 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(W25Q32_RANGES),
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::W25q64 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(W25Q64_RANGES),
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::W25q80 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(W25Q80_RANGES),
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::W25q128 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Cmp {
                cmp0: W25Q128_CMP0_RANGES,
                cmp1: W25Q128_CMP1_RANGES,
            },
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::Gd25q32 => FamilyDef {
            layout: SrLayout::new(2, 5, 7),
            style: MatchStyle::Bp,
            select: TableSelect::Cmp {
                cmp0: GD25Q32_CMP0_RANGES,
                cmp1: GD25Q32_CMP1_RANGES,
            },
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::Gd25q128 => FamilyDef {
            layout: SrLayout::new(2, 5, 7),
            style: MatchStyle::Bp,
            select: TableSelect::Cmp {
                cmp0: GD25Q128_CMP0_RANGES,
                cmp1: GD25Q128_CMP1_RANGES,
            },
            modifier_bit: None,
            has_sr2: true,
        },
        WpFamily::Mx25l6406e => FamilyDef {
            layout: SrLayout::new(2, 4, 7),
            style: MatchStyle::Bp,
            select: TableSelect::Fixed(MX25L6406E_RANGES),
            modifier_bit: None,
            has_sr2: false,
        },
        WpFamily::Mx25l6495f => FamilyDef {
            layout: SrLayout::new(2, 4, 7),
            style: MatchStyle::Bp,
            select: TableSelect::ConfigTb {
                tb0: MX25L6495F_TB0_RANGES,
                tb1: MX25L6495F_TB1_RANGES,
            },
            modifier_bit: None,
            has_sr2: false,
        },
        WpFamily::En25f40 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(EN25F40_RANGES),
            modifier_bit: None,
            has_sr2: false,
        },
        WpFamily::En25q64 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(EN25Q64_RANGES),
            modifier_bit: None,
            has_sr2: false,
        },
        WpFamily::N25q064 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(N25Q064_RANGES),
            modifier_bit: None,
            has_sr2: false,
        },
        WpFamily::A25l040 => FamilyDef {
            layout: WINBOND_LAYOUT,
            style: MatchStyle::SecTb,
            select: TableSelect::Fixed(A25L040_RANGES),
            modifier_bit: None,
            has_sr2: false,
        },
        WpFamily::S25fs128s => FamilyDef {
            layout: SrLayout::new(2, 3, 7),
            style: MatchStyle::Bp,
            select: TableSelect::Fixed(S25FS128S_RANGES),
            modifier_bit: Some(5),
            has_sr2: true,
        },
        WpFamily::S25fl256s => FamilyDef {
            layout: SrLayout::new(2, 3, 7),
            style: MatchStyle::Bp,
            select: TableSelect::Fixed(S25FL256S_RANGES),
            modifier_bit: Some(5),
            has_sr2: true,
        },
    }
}

static W25Q16_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x1f0000, 64 * KIB),
    row(Off, Off, 0x2, 0x1e0000, 128 * KIB),
    row(Off, Off, 0x3, 0x1c0000, 256 * KIB),
    row(Off, Off, 0x4, 0x180000, 512 * KIB),
    row(Off, Off, 0x5, 0x100000, 1024 * KIB),
    row(Off, On, 0x1, 0x000000, 64 * KIB),
    row(Off, On, 0x2, 0x000000, 128 * KIB),
    row(Off, On, 0x3, 0x000000, 256 * KIB),
    row(Off, On, 0x4, 0x000000, 512 * KIB),
    row(Off, On, 0x5, 0x000000, 1024 * KIB),
    row(Any, Any, 0x6, 0x000000, 2048 * KIB),
    row(Any, Any, 0x7, 0x000000, 2048 * KIB),
    row(On, Off, 0x1, 0x1ff000, 4 * KIB),
    row(On, Off, 0x2, 0x1fe000, 8 * KIB),
    row(On, Off, 0x3, 0x1fc000, 16 * KIB),
    row(On, Off, 0x4, 0x1f8000, 32 * KIB),
    row(On, Off, 0x5, 0x1f8000, 32 * KIB),
    row(On, On, 0x1, 0x000000, 4 * KIB),
    row(On, On, 0x2, 0x000000, 8 * KIB),
    row(On, On, 0x3, 0x000000, 16 * KIB),
    row(On, On, 0x4, 0x000000, 32 * KIB),
    row(On, On, 0x5, 0x000000, 32 * KIB),
];

static W25Q32_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x3f0000, 64 * KIB),
    row(Off, Off, 0x2, 0x3e0000, 128 * KIB),
    row(Off, Off, 0x3, 0x3c0000, 256 * KIB),
    row(Off, Off, 0x4, 0x380000, 512 * KIB),
    row(Off, Off, 0x5, 0x300000, 1024 * KIB),
    row(Off, Off, 0x6, 0x200000, 2048 * KIB),
    row(Off, On, 0x1, 0x000000, 64 * KIB),
    row(Off, On, 0x2, 0x000000, 128 * KIB),
    row(Off, On, 0x3, 0x000000, 256 * KIB),
    row(Off, On, 0x4, 0x000000, 512 * KIB),
    row(Off, On, 0x5, 0x000000, 1024 * KIB),
    row(Off, On, 0x6, 0x000000, 2048 * KIB),
    row(Any, Any, 0x7, 0x000000, 4096 * KIB),
    row(On, Off, 0x1, 0x3ff000, 4 * KIB),
    row(On, Off, 0x2, 0x3fe000, 8 * KIB),
    row(On, Off, 0x3, 0x3fc000, 16 * KIB),
    row(On, Off, 0x4, 0x3f8000, 32 * KIB),
    row(On, Off, 0x5, 0x3f8000, 32 * KIB),
    row(On, On, 0x1, 0x000000, 4 * KIB),
    row(On, On, 0x2, 0x000000, 8 * KIB),
    row(On, On, 0x3, 0x000000, 16 * KIB),
    row(On, On, 0x4, 0x000000, 32 * KIB),
    row(On, On, 0x5, 0x000000, 32 * KIB),
];

static W25Q80_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x0f0000, 64 * KIB),
    row(Off, Off, 0x2, 0x0e0000, 128 * KIB),
    row(Off, Off, 0x3, 0x0c0000, 256 * KIB),
    row(Off, Off, 0x4, 0x080000, 512 * KIB),
    row(Off, On, 0x1, 0x000000, 64 * KIB),
    row(Off, On, 0x2, 0x000000, 128 * KIB),
    row(Off, On, 0x3, 0x000000, 256 * KIB),
    row(Off, On, 0x4, 0x000000, 512 * KIB),
    row(Any, Any, 0x6, 0x000000, 1024 * KIB),
    row(Any, Any, 0x7, 0x000000, 1024 * KIB),
    row(On, Off, 0x1, 0x1ff000, 4 * KIB),
    row(On, Off, 0x2, 0x1fe000, 8 * KIB),
    row(On, Off, 0x3, 0x1fc000, 16 * KIB),
    row(On, Off, 0x4, 0x1f8000, 32 * KIB),
    row(On, Off, 0x5, 0x1f8000, 32 * KIB),
    row(On, On, 0x1, 0x000000, 4 * KIB),
    row(On, On, 0x2, 0x000000, 8 * KIB),
    row(On, On, 0x3, 0x000000, 16 * KIB),
    row(On, On, 0x4, 0x000000, 32 * KIB),
    row(On, On, 0x5, 0x000000, 32 * KIB),
];

static W25Q64_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x7e0000, 128 * KIB),
    row(Off, Off, 0x2, 0x7c0000, 256 * KIB),
    row(Off, Off, 0x3, 0x780000, 512 * KIB),
    row(Off, Off, 0x4, 0x700000, 1024 * KIB),
    row(Off, Off, 0x5, 0x600000, 2048 * KIB),
    row(Off, Off, 0x6, 0x400000, 4096 * KIB),
    row(Off, On, 0x1, 0x000000, 128 * KIB),
    row(Off, On, 0x2, 0x000000, 256 * KIB),
    row(Off, On, 0x3, 0x000000, 512 * KIB),
    row(Off, On, 0x4, 0x000000, 1024 * KIB),
    row(Off, On, 0x5, 0x000000, 2048 * KIB),
    row(Off, On, 0x6, 0x000000, 4096 * KIB),
    row(Any, Any, 0x7, 0x000000, 8192 * KIB),
    row(On, Off, 0x1, 0x7ff000, 4 * KIB),
    row(On, Off, 0x2, 0x7fe000, 8 * KIB),
    row(On, Off, 0x3, 0x7fc000, 16 * KIB),
    row(On, Off, 0x4, 0x7f8000, 32 * KIB),
    row(On, Off, 0x5, 0x7f8000, 32 * KIB),
    row(On, On, 0x1, 0x000000, 4 * KIB),
    row(On, On, 0x2, 0x000000, 8 * KIB),
    row(On, On, 0x3, 0x000000, 16 * KIB),
    row(On, On, 0x4, 0x000000, 32 * KIB),
    row(On, On, 0x5, 0x000000, 32 * KIB),
];

static W25Q128_CMP0_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Off, Off, 0x1, 0xfc0000, 256 * KIB),
    row(Off, Off, 0x2, 0xf80000, 512 * KIB),
    row(Off, Off, 0x3, 0xf00000, 1024 * KIB),
    row(Off, Off, 0x4, 0xe00000, 2048 * KIB),
    row(Off, Off, 0x5, 0xc00000, 4096 * KIB),
    row(Off, Off, 0x6, 0x800000, 8192 * KIB),
    row(Off, On, 0x1, 0x000000, 256 * KIB),
    row(Off, On, 0x2, 0x000000, 512 * KIB),
    row(Off, On, 0x3, 0x000000, 1024 * KIB),
    row(Off, On, 0x4, 0x000000, 2048 * KIB),
    row(Off, On, 0x5, 0x000000, 4096 * KIB),
    row(Off, On, 0x6, 0x000000, 8192 * KIB),
    row(Any, Any, 0x7, 0x000000, 16384 * KIB),
    row(On, Off, 0x1, 0xfff000, 4 * KIB),
    row(On, Off, 0x2, 0xffe000, 8 * KIB),
    row(On, Off, 0x3, 0xffc000, 16 * KIB),
    row(On, Off, 0x4, 0xff8000, 32 * KIB),
    row(On, Off, 0x5, 0xff8000, 32 * KIB),
    row(On, On, 0x1, 0x000000, 4 * KIB),
    row(On, On, 0x2, 0x000000, 8 * KIB),
    row(On, On, 0x3, 0x000000, 16 * KIB),
    row(On, On, 0x4, 0x000000, 32 * KIB),
    row(On, On, 0x5, 0x000000, 32 * KIB),
];

static W25Q128_CMP1_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0x000000, 16 * MIB),
    row(Off, Off, 0x1, 0x000000, 16128 * KIB),
    row(Off, Off, 0x2, 0x000000, 15872 * KIB),
    row(Off, Off, 0x3, 0x000000, 15 * MIB),
    row(Off, Off, 0x4, 0x000000, 14 * MIB),
    row(Off, Off, 0x5, 0x000000, 12 * MIB),
    row(Off, Off, 0x6, 0x000000, 8 * MIB),
    row(Off, On, 0x1, 0x040000, 16128 * KIB),
    row(Off, On, 0x2, 0x080000, 15872 * KIB),
    row(Off, On, 0x3, 0x100000, 15 * MIB),
    row(Off, On, 0x4, 0x200000, 14 * MIB),
    row(Off, On, 0x5, 0x400000, 12 * MIB),
    row(Off, On, 0x6, 0x800000, 8 * MIB),
    row(Any, Any, 0x7, 0x000000, 0),
    row(On, Off, 0x1, 0x000000, 16380 * KIB),
    row(On, Off, 0x2, 0x000000, 16376 * KIB),
    row(On, Off, 0x3, 0x000000, 16368 * KIB),
    row(On, Off, 0x4, 0x000000, 16352 * KIB),
    row(On, Off, 0x5, 0x000000, 16352 * KIB),
    row(On, On, 0x1, 0x001000, 16380 * KIB),
    row(On, On, 0x2, 0x002000, 16376 * KIB),
    row(On, On, 0x3, 0x004000, 16368 * KIB),
    row(On, On, 0x4, 0x008000, 16352 * KIB),
    row(On, On, 0x5, 0x008000, 16352 * KIB),
];

static EN25F40_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x000000, 504 * KIB),
    row(Off, Off, 0x2, 0x000000, 496 * KIB),
    row(Off, Off, 0x3, 0x000000, 480 * KIB),
    row(Off, Off, 0x4, 0x000000, 448 * KIB),
    row(Off, Off, 0x5, 0x000000, 384 * KIB),
    row(Off, Off, 0x6, 0x000000, 256 * KIB),
    row(Off, Off, 0x7, 0x000000, 512 * KIB),
];

static EN25Q64_RANGES: &[RangeEntry] = &[
    row(Off, Off, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x000000, 8128 * KIB),
    row(Off, Off, 0x2, 0x000000, 8064 * KIB),
    row(Off, Off, 0x3, 0x000000, 7936 * KIB),
    row(Off, Off, 0x4, 0x000000, 7680 * KIB),
    row(Off, Off, 0x5, 0x000000, 7168 * KIB),
    row(Off, Off, 0x6, 0x000000, 6144 * KIB),
    row(Off, Off, 0x7, 0x000000, 8192 * KIB),
    row(Off, On, 0x0, 0, 0),
    row(Off, On, 0x1, 0x010000, 8128 * KIB),
    row(Off, On, 0x2, 0x020000, 8064 * KIB),
    row(Off, On, 0x3, 0x040000, 7936 * KIB),
    row(Off, On, 0x4, 0x080000, 7680 * KIB),
    row(Off, On, 0x5, 0x100000, 7168 * KIB),
    row(Off, On, 0x6, 0x200000, 6144 * KIB),
    row(Off, On, 0x7, 0x000000, 8192 * KIB),
];

static N25Q064_RANGES: &[RangeEntry] = &[
    // SEC is documented as BP3 on this part, only meaningful for
    // whole-chip protection
    row(Off, Off, 0x0, 0, 0),
    row(Off, Off, 0x1, 0x7f0000, 64 * KIB),
    row(Off, Off, 0x2, 0x7e0000, 128 * KIB),
    row(Off, Off, 0x3, 0x7c0000, 256 * KIB),
    row(Off, Off, 0x4, 0x780000, 512 * KIB),
    row(Off, Off, 0x5, 0x700000, 1024 * KIB),
    row(Off, Off, 0x6, 0x600000, 2048 * KIB),
    row(Off, Off, 0x7, 0x400000, 4096 * KIB),
    row(Off, On, 0x1, 0x000000, 64 * KIB),
    row(Off, On, 0x2, 0x000000, 128 * KIB),
    row(Off, On, 0x3, 0x000000, 256 * KIB),
    row(Off, On, 0x4, 0x000000, 512 * KIB),
    row(Off, On, 0x5, 0x000000, 1024 * KIB),
    row(Off, On, 0x6, 0x000000, 2048 * KIB),
    row(Off, On, 0x7, 0x000000, 4096 * KIB),
    row(Any, On, 0x0, 0x000000, 8192 * KIB),
    row(Any, On, 0x1, 0x000000, 8192 * KIB),
    row(Any, On, 0x2, 0x000000, 8192 * KIB),
    row(Any, On, 0x3, 0x000000, 8192 * KIB),
    row(Any, On, 0x4, 0x000000, 8192 * KIB),
    row(Any, On, 0x5, 0x000000, 8192 * KIB),
    row(Any, On, 0x6, 0x000000, 8192 * KIB),
    row(Any, On, 0x7, 0x000000, 8192 * KIB),
];

static A25L040_RANGES: &[RangeEntry] = &[
    row(Any, Any, 0x0, 0, 0),
    row(Any, Any, 0x1, 0x70000, 64 * KIB),
    row(Any, Any, 0x2, 0x60000, 128 * KIB),
    row(Any, Any, 0x3, 0x40000, 256 * KIB),
    row(Any, Any, 0x4, 0x00000, 512 * KIB),
    row(Any, Any, 0x5, 0x00000, 512 * KIB),
    row(Any, Any, 0x6, 0x00000, 512 * KIB),
    row(Any, Any, 0x7, 0x00000, 512 * KIB),
];

static GD25Q32_CMP0_RANGES: &[RangeEntry] = &[
    // BP4 and BP3 are don't-care in the none and all groups
    bp_row(0x00, 0, 0),
    bp_row(0x08, 0, 0),
    bp_row(0x10, 0, 0),
    bp_row(0x18, 0, 0),
    bp_row(0x01, 0x3f0000, 64 * KIB),
    bp_row(0x02, 0x3e0000, 128 * KIB),
    bp_row(0x03, 0x3c0000, 256 * KIB),
    bp_row(0x04, 0x380000, 512 * KIB),
    bp_row(0x05, 0x300000, 1024 * KIB),
    bp_row(0x06, 0x200000, 2048 * KIB),
    bp_row(0x09, 0x000000, 64 * KIB),
    bp_row(0x0a, 0x000000, 128 * KIB),
    bp_row(0x0b, 0x000000, 256 * KIB),
    bp_row(0x0c, 0x000000, 512 * KIB),
    bp_row(0x0d, 0x000000, 1024 * KIB),
    bp_row(0x0e, 0x000000, 2048 * KIB),
    bp_row(0x07, 0x000000, 4096 * KIB),
    bp_row(0x0f, 0x000000, 4096 * KIB),
    bp_row(0x17, 0x000000, 4096 * KIB),
    bp_row(0x1f, 0x000000, 4096 * KIB),
    bp_row(0x11, 0x3ff000, 4 * KIB),
    bp_row(0x12, 0x3fe000, 8 * KIB),
    bp_row(0x13, 0x3fc000, 16 * KIB),
    bp_row(0x14, 0x3f8000, 32 * KIB),
    bp_row(0x15, 0x3f8000, 32 * KIB),
    bp_row(0x16, 0x3f8000, 32 * KIB),
    bp_row(0x19, 0x000000, 4 * KIB),
    bp_row(0x1a, 0x000000, 8 * KIB),
    bp_row(0x1b, 0x000000, 16 * KIB),
    bp_row(0x1c, 0x000000, 32 * KIB),
    bp_row(0x1d, 0x000000, 32 * KIB),
    bp_row(0x1e, 0x000000, 32 * KIB),
];

static GD25Q32_CMP1_RANGES: &[RangeEntry] = &[
    bp_row(0x00, 0x000000, 4096 * KIB),
    bp_row(0x08, 0x000000, 4096 * KIB),
    bp_row(0x10, 0x000000, 4096 * KIB),
    bp_row(0x18, 0x000000, 4096 * KIB),
    bp_row(0x01, 0x000000, 4032 * KIB),
    bp_row(0x02, 0x000000, 3968 * KIB),
    bp_row(0x03, 0x000000, 3840 * KIB),
    bp_row(0x04, 0x000000, 3584 * KIB),
    bp_row(0x05, 0x000000, 3 * MIB),
    bp_row(0x06, 0x000000, 2 * MIB),
    bp_row(0x09, 0x010000, 4032 * KIB),
    bp_row(0x0a, 0x020000, 3968 * KIB),
    bp_row(0x0b, 0x040000, 3840 * KIB),
    bp_row(0x0c, 0x080000, 3584 * KIB),
    bp_row(0x0d, 0x100000, 3 * MIB),
    bp_row(0x0e, 0x200000, 2 * MIB),
    bp_row(0x07, 0, 0),
    bp_row(0x0f, 0, 0),
    bp_row(0x17, 0, 0),
    bp_row(0x1f, 0, 0),
    bp_row(0x11, 0x000000, 4092 * KIB),
    bp_row(0x12, 0x000000, 4088 * KIB),
    bp_row(0x13, 0x000000, 4080 * KIB),
    bp_row(0x14, 0x000000, 4064 * KIB),
    bp_row(0x15, 0x000000, 4064 * KIB),
    bp_row(0x16, 0x000000, 4064 * KIB),
    bp_row(0x19, 0x001000, 4092 * KIB),
    bp_row(0x1a, 0x002000, 4088 * KIB),
    bp_row(0x1b, 0x040000, 4080 * KIB),
    bp_row(0x1c, 0x080000, 4064 * KIB),
    bp_row(0x1d, 0x080000, 4064 * KIB),
    bp_row(0x1e, 0x080000, 4064 * KIB),
];

static GD25Q128_CMP0_RANGES: &[RangeEntry] = &[
    bp_row(0x00, 0, 0),
    bp_row(0x08, 0, 0),
    bp_row(0x10, 0, 0),
    bp_row(0x18, 0, 0),
    bp_row(0x01, 0xfc0000, 256 * KIB),
    bp_row(0x02, 0xf80000, 512 * KIB),
    bp_row(0x03, 0xf00000, 1024 * KIB),
    bp_row(0x04, 0xe00000, 2048 * KIB),
    bp_row(0x05, 0xc00000, 4096 * KIB),
    bp_row(0x06, 0x800000, 8192 * KIB),
    bp_row(0x09, 0x000000, 256 * KIB),
    bp_row(0x0a, 0x000000, 512 * KIB),
    bp_row(0x0b, 0x000000, 1024 * KIB),
    bp_row(0x0c, 0x000000, 2048 * KIB),
    bp_row(0x0d, 0x000000, 4096 * KIB),
    bp_row(0x0e, 0x000000, 8192 * KIB),
    bp_row(0x07, 0x000000, 16384 * KIB),
    bp_row(0x0f, 0x000000, 16384 * KIB),
    bp_row(0x17, 0x000000, 16384 * KIB),
    bp_row(0x1f, 0x000000, 16384 * KIB),
    bp_row(0x11, 0xfff000, 4 * KIB),
    bp_row(0x12, 0xffe000, 8 * KIB),
    bp_row(0x13, 0xffc000, 16 * KIB),
    bp_row(0x14, 0xff8000, 32 * KIB),
    bp_row(0x15, 0xff8000, 32 * KIB),
    bp_row(0x19, 0x000000, 4 * KIB),
    bp_row(0x1a, 0x000000, 8 * KIB),
    bp_row(0x1b, 0x000000, 16 * KIB),
    bp_row(0x1c, 0x000000, 32 * KIB),
    bp_row(0x1d, 0x000000, 32 * KIB),
    bp_row(0x1e, 0x000000, 32 * KIB),
];

static GD25Q128_CMP1_RANGES: &[RangeEntry] = &[
    bp_row(0x00, 0x000000, 16384 * KIB),
    bp_row(0x08, 0x000000, 16384 * KIB),
    bp_row(0x10, 0x000000, 16384 * KIB),
    bp_row(0x18, 0x000000, 16384 * KIB),
    bp_row(0x01, 0x000000, 16128 * KIB),
    bp_row(0x02, 0x000000, 15872 * KIB),
    bp_row(0x03, 0x000000, 15360 * KIB),
    bp_row(0x04, 0x000000, 14336 * KIB),
    bp_row(0x05, 0x000000, 12288 * KIB),
    bp_row(0x06, 0x000000, 8192 * KIB),
    bp_row(0x09, 0x000000, 16128 * KIB),
    bp_row(0x0a, 0x000000, 15872 * KIB),
    bp_row(0x0b, 0x000000, 15360 * KIB),
    bp_row(0x0c, 0x000000, 14336 * KIB),
    bp_row(0x0d, 0x000000, 12288 * KIB),
    bp_row(0x0e, 0x000000, 8192 * KIB),
    bp_row(0x07, 0x000000, 16384 * KIB),
    bp_row(0x08, 0x000000, 16384 * KIB),
    bp_row(0x0f, 0x000000, 16384 * KIB),
    bp_row(0x17, 0x000000, 16384 * KIB),
    bp_row(0x1f, 0x000000, 16384 * KIB),
    bp_row(0x11, 0x000000, 16380 * KIB),
    bp_row(0x12, 0x000000, 16376 * KIB),
    bp_row(0x13, 0x000000, 16368 * KIB),
    bp_row(0x14, 0x000000, 16352 * KIB),
    bp_row(0x15, 0x000000, 16352 * KIB),
    bp_row(0x19, 0x001000, 16380 * KIB),
    bp_row(0x1a, 0x002000, 16376 * KIB),
    bp_row(0x1b, 0x004000, 16368 * KIB),
    bp_row(0x1c, 0x008000, 16352 * KIB),
    bp_row(0x1d, 0x008000, 16352 * KIB),
    bp_row(0x1e, 0x008000, 16352 * KIB),
];

static MX25L6406E_RANGES: &[RangeEntry] = &[
    bp_row(0x0, 0, 0),
    bp_row(0x1, 0x7e0000, 64 * 2 * KIB),
    bp_row(0x2, 0x7c0000, 64 * 4 * KIB),
    bp_row(0x3, 0x7a0000, 64 * 8 * KIB),
    bp_row(0x4, 0x700000, 64 * 16 * KIB),
    bp_row(0x5, 0x600000, 64 * 32 * KIB),
    bp_row(0x6, 0x400000, 64 * 64 * KIB),
    bp_row(0x7, 0x000000, 64 * 128 * KIB),
    bp_row(0x8, 0x000000, 64 * 128 * KIB),
    bp_row(0x9, 0x000000, 64 * 64 * KIB),
    bp_row(0xa, 0x000000, 64 * 96 * KIB),
    bp_row(0xb, 0x000000, 64 * 112 * KIB),
    bp_row(0xc, 0x000000, 64 * 120 * KIB),
    bp_row(0xd, 0x000000, 64 * 124 * KIB),
    bp_row(0xe, 0x000000, 64 * 126 * KIB),
    bp_row(0xf, 0x000000, 64 * 128 * KIB),
];

static MX25L6495F_TB0_RANGES: &[RangeEntry] = &[
    bp_row(0x0, 0, 0),
    bp_row(0x1, 0x7f0000, 64 * KIB),
    bp_row(0x2, 0x7e0000, 64 * 2 * KIB),
    bp_row(0x3, 0x7c0000, 64 * 4 * KIB),
    bp_row(0x4, 0x780000, 64 * 8 * KIB),
    bp_row(0x5, 0x700000, 64 * 16 * KIB),
    bp_row(0x6, 0x600000, 64 * 32 * KIB),
    bp_row(0x7, 0x400000, 64 * 64 * KIB),
    bp_row(0x8, 0x000000, 64 * 128 * KIB),
    bp_row(0x9, 0x000000, 64 * 128 * KIB),
    bp_row(0xa, 0x000000, 64 * 128 * KIB),
    bp_row(0xb, 0x000000, 64 * 128 * KIB),
    bp_row(0xc, 0x000000, 64 * 128 * KIB),
    bp_row(0xd, 0x000000, 64 * 128 * KIB),
    bp_row(0xe, 0x000000, 64 * 128 * KIB),
    bp_row(0xf, 0x000000, 64 * 128 * KIB),
];

static MX25L6495F_TB1_RANGES: &[RangeEntry] = &[
    bp_row(0x0, 0, 0),
    bp_row(0x1, 0x000000, 64 * KIB),
    bp_row(0x2, 0x000000, 64 * 2 * KIB),
    bp_row(0x3, 0x000000, 64 * 4 * KIB),
    bp_row(0x4, 0x000000, 64 * 8 * KIB),
    bp_row(0x5, 0x000000, 64 * 16 * KIB),
    bp_row(0x6, 0x000000, 64 * 32 * KIB),
    bp_row(0x7, 0x000000, 64 * 64 * KIB),
    bp_row(0x8, 0x000000, 64 * 128 * KIB),
    bp_row(0x9, 0x000000, 64 * 128 * KIB),
    bp_row(0xa, 0x000000, 64 * 128 * KIB),
    bp_row(0xb, 0x000000, 64 * 128 * KIB),
    bp_row(0xc, 0x000000, 64 * 128 * KIB),
    bp_row(0xd, 0x000000, 64 * 128 * KIB),
    bp_row(0xe, 0x000000, 64 * 128 * KIB),
    bp_row(0xf, 0x000000, 64 * 128 * KIB),
];

// TBPROT (CR1 bit 5) selects whether BP counts from the bottom or the top
static S25FS128S_RANGES: &[RangeEntry] = &[
    row(Any, On, 0x0, 0, 0),
    row(Any, On, 0x1, 0x000000, 256 * KIB),
    row(Any, On, 0x2, 0x000000, 512 * KIB),
    row(Any, On, 0x3, 0x000000, 1024 * KIB),
    row(Any, On, 0x4, 0x000000, 2048 * KIB),
    row(Any, On, 0x5, 0x000000, 4096 * KIB),
    row(Any, On, 0x6, 0x000000, 8192 * KIB),
    row(Any, On, 0x7, 0x000000, 16384 * KIB),
    row(Any, Off, 0x0, 0, 0),
    row(Any, Off, 0x1, 0xfc0000, 256 * KIB),
    row(Any, Off, 0x2, 0xf80000, 512 * KIB),
    row(Any, Off, 0x3, 0xf00000, 1024 * KIB),
    row(Any, Off, 0x4, 0xe00000, 2048 * KIB),
    row(Any, Off, 0x5, 0xc00000, 4096 * KIB),
    row(Any, Off, 0x6, 0x800000, 8192 * KIB),
    row(Any, Off, 0x7, 0x000000, 16384 * KIB),
];

static S25FL256S_RANGES: &[RangeEntry] = &[
    row(Any, On, 0x0, 0, 0),
    row(Any, On, 0x1, 0x000000, 512 * KIB),
    row(Any, On, 0x2, 0x000000, 1024 * KIB),
    row(Any, On, 0x3, 0x000000, 2048 * KIB),
    row(Any, On, 0x4, 0x000000, 4096 * KIB),
    row(Any, On, 0x5, 0x000000, 8192 * KIB),
    row(Any, On, 0x6, 0x000000, 16384 * KIB),
    row(Any, On, 0x7, 0x000000, 32768 * KIB),
    row(Any, Off, 0x0, 0, 0),
    row(Any, Off, 0x1, 0x1f80000, 512 * KIB),
    row(Any, Off, 0x2, 0x1f00000, 1024 * KIB),
    row(Any, Off, 0x3, 0x1e00000, 2048 * KIB),
    row(Any, Off, 0x4, 0x1c00000, 4096 * KIB),
    row(Any, Off, 0x5, 0x1800000, 8192 * KIB),
    row(Any, Off, 0x6, 0x1000000, 16384 * KIB),
    row(Any, Off, 0x7, 0x000000, 32768 * KIB),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sizes() {
        assert_eq!(W25Q16_RANGES.len(), 23);
        assert_eq!(W25Q32_RANGES.len(), 24);
        assert_eq!(W25Q80_RANGES.len(), 21);
        assert_eq!(W25Q64_RANGES.len(), 24);
        assert_eq!(W25Q128_CMP0_RANGES.len(), 24);
        assert_eq!(W25Q128_CMP1_RANGES.len(), 24);
        assert_eq!(GD25Q32_CMP0_RANGES.len(), 32);
        assert_eq!(GD25Q32_CMP1_RANGES.len(), 32);
        assert_eq!(GD25Q128_CMP0_RANGES.len(), 31);
        assert_eq!(GD25Q128_CMP1_RANGES.len(), 32);
    }

    #[test]
    fn masks_per_family() {
        let def = family_def(WpFamily::W25q16);
        assert_eq!(def.sr1_mask(), 0x9c);
        assert_eq!(def.sr2_mask(), 0x01);

        let def = family_def(WpFamily::Gd25q32);
        assert_eq!(def.sr1_mask(), 0xfc);
        assert_eq!(def.sr2_mask(), 0x01);

        let def = family_def(WpFamily::Mx25l6406e);
        assert_eq!(def.sr1_mask(), 0xbc);
        assert_eq!(def.sr2_mask(), 0x00);

        let def = family_def(WpFamily::S25fs128s);
        assert_eq!(def.sr1_mask(), 0x9c);
        assert_eq!(def.sr2_mask(), 0x21);
    }

    #[test]
    fn bp_values_fit_field() {
        for family in [
            WpFamily::W25q16,
            WpFamily::W25q32,
            WpFamily::W25q64,
            WpFamily::W25q80,
            WpFamily::W25q128,
            WpFamily::Gd25q32,
            WpFamily::Gd25q128,
            WpFamily::Mx25l6406e,
            WpFamily::Mx25l6495f,
            WpFamily::En25f40,
            WpFamily::En25q64,
            WpFamily::N25q064,
            WpFamily::A25l040,
            WpFamily::S25fs128s,
            WpFamily::S25fl256s,
        ] {
            let def = family_def(family);
            let max = (1u8 << def.layout.bp_bits) - 1;
            let check = |table: &[RangeEntry]| {
                for entry in table {
                    assert!(entry.bp <= max);
                }
            };
            match def.select {
                TableSelect::Fixed(t) => check(t),
                TableSelect::Cmp { cmp0, cmp1 } => {
                    check(cmp0);
                    check(cmp1);
                }
                TableSelect::ConfigTb { tb0, tb1 } => {
                    check(tb0);
                    check(tb1);
                }
            }
        }
    }
}

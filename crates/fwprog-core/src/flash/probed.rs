//! Identified chip plus the addressing state negotiated with it

use crate::chip::{Features, FlashChip};
use crate::spi::AddrWidth;

/// Address mode the chip is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddrMode {
    /// 24-bit addressing, the power-on state of most parts
    #[default]
    Three,
    /// 32-bit addressing for parts beyond 16 MiB
    Four,
}

impl AddrMode {
    /// Address width carried by plain read/program opcodes in this mode
    pub fn width(self) -> AddrWidth {
        match self {
            Self::Three => AddrWidth::Three,
            Self::Four => AddrWidth::Four,
        }
    }
}

/// A chip identified by JEDEC probe, ready for protocol operations
///
/// Bundles the database entry with the addressing decisions made at
/// probe time. Parts over 16 MiB either carry dedicated 4-byte opcodes
/// or must be switched into 4-byte mode before every large access.
#[derive(Debug)]
pub struct ProbedChip {
    /// Database entry for the identified part
    pub chip: &'static FlashChip,
    /// Address mode the chip is assumed to be in
    pub addr_mode: AddrMode,
    /// Part has native 4-byte opcodes, no mode switch needed
    pub native_4ba: bool,
}

impl ProbedChip {
    /// Pair a database entry with its initial addressing state
    pub fn new(chip: &'static FlashChip) -> Self {
        let addr_mode = if chip.requires_4byte_addr() {
            AddrMode::Four
        } else {
            AddrMode::Three
        };

        Self {
            chip,
            addr_mode,
            native_4ba: chip.features.contains(Features::FOUR_BYTE_NATIVE),
        }
    }

    /// Program page size in bytes
    pub fn page_size(&self) -> usize {
        self.chip.page_size as usize
    }

    /// Capacity in bytes
    pub fn total_size(&self) -> usize {
        self.chip.total_size as usize
    }

    /// Whether `len` bytes starting at `addr` stay inside the part
    pub fn in_bounds(&self, addr: u32, len: usize) -> bool {
        addr < self.chip.total_size && addr as u64 + len as u64 <= self.chip.total_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::database;

    #[test]
    fn small_chip_starts_in_three_byte_mode() {
        let chip = database::find_by_jedec_id(0xEF, 0x4016).unwrap();
        let probed = ProbedChip::new(chip);
        assert_eq!(probed.addr_mode, AddrMode::Three);
    }

    #[test]
    fn range_checks_cover_the_ends() {
        let chip = database::find_by_jedec_id(0xEF, 0x4016).unwrap();
        let probed = ProbedChip::new(chip);
        let size = probed.total_size();
        assert!(probed.in_bounds(0, size));
        assert!(!probed.in_bounds(0, size + 1));
        assert!(!probed.in_bounds(size as u32, 1));
    }
}

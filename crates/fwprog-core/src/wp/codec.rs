//! Status register bit codec
//!
//! Flash vendors place the block-protect field and the SRP bits at
//! different positions in the status register. `SrLayout` captures those
//! positions for a chip family and `StatusSnapshot` holds the raw status
//! bytes with typed accessors on top.

use crate::spi::opcodes;

use super::types::WpMode;

/// Bit positions of the protection fields within the status registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrLayout {
    /// Position of the lowest block-protect bit in SR1
    pub bp0_pos: u8,
    /// Number of block-protect bits
    pub bp_bits: u8,
    /// Position of the SRP0 bit in SR1
    pub srp_pos: u8,
}

impl SrLayout {
    /// Create a new layout
    pub const fn new(bp0_pos: u8, bp_bits: u8, srp_pos: u8) -> Self {
        Self {
            bp0_pos,
            bp_bits,
            srp_pos,
        }
    }

    /// Mask covering the block-protect field in SR1
    pub const fn bp_mask(&self) -> u8 {
        (((1u16 << (self.bp0_pos + self.bp_bits)) - 1) as u8)
            & !(((1u16 << self.bp0_pos) - 1) as u8)
    }

    /// Mask covering the SRP0 bit in SR1
    pub const fn srp_mask(&self) -> u8 {
        1 << self.srp_pos
    }

    /// Extract the block-protect field value from an SR1 byte
    pub const fn extract_bp(&self, sr1: u8) -> u8 {
        (sr1 & self.bp_mask()) >> self.bp0_pos
    }

    /// Insert a block-protect field value into an SR1 byte
    pub const fn insert_bp(&self, sr1: u8, bp: u8) -> u8 {
        (sr1 & !self.bp_mask()) | ((bp << self.bp0_pos) & self.bp_mask())
    }
}

/// The common Winbond layout: BP0-BP2 at bits 2-4, SRP0 at bit 7
pub const WINBOND_LAYOUT: SrLayout = SrLayout::new(2, 3, 7);

/// A point-in-time capture of the status register bytes
///
/// `sr2` is `None` on chips with a single status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Status register 1
    pub sr1: u8,
    /// Status register 2 (SR2 or CR1 depending on vendor)
    pub sr2: Option<u8>,
}

impl StatusSnapshot {
    /// Create a new snapshot
    pub const fn new(sr1: u8, sr2: Option<u8>) -> Self {
        Self { sr1, sr2 }
    }

    /// Write-in-progress bit
    pub const fn busy(&self) -> bool {
        self.sr1 & opcodes::SR1_BUSY != 0
    }

    /// Write-enable-latch bit
    pub const fn wel(&self) -> bool {
        self.sr1 & opcodes::SR1_WEL != 0
    }

    /// Block-protect field value for the given layout
    pub const fn bp(&self, layout: &SrLayout) -> u8 {
        layout.extract_bp(self.sr1)
    }

    /// SEC bit (sector/block protect granularity)
    pub const fn sec(&self) -> bool {
        self.sr1 & opcodes::SR1_SEC != 0
    }

    /// TB bit (top/bottom select)
    pub const fn tb(&self) -> bool {
        self.sr1 & opcodes::SR1_TB != 0
    }

    /// SRP0 bit for the given layout
    pub const fn srp0(&self, layout: &SrLayout) -> bool {
        self.sr1 & layout.srp_mask() != 0
    }

    /// SRP1 bit, false when there is no second status register
    pub const fn srp1(&self) -> bool {
        match self.sr2 {
            Some(sr2) => sr2 & opcodes::SR2_SRP1 != 0,
            None => false,
        }
    }

    /// CMP bit (range complement), false when there is no second register
    pub const fn cmp(&self) -> bool {
        match self.sr2 {
            Some(sr2) => sr2 & opcodes::SR2_CMP != 0,
            None => false,
        }
    }

    /// Arbitrary bit of the second status register
    pub const fn sr2_bit(&self, pos: u8) -> bool {
        match self.sr2 {
            Some(sr2) => sr2 & (1 << pos) != 0,
            None => false,
        }
    }

    /// Protection mode derived from the SRP bits
    pub const fn mode(&self, layout: &SrLayout) -> WpMode {
        WpMode::from_srp_bits(self.srp0(layout), self.srp1())
    }

    /// Set the block-protect field
    pub const fn set_bp(&mut self, layout: &SrLayout, bp: u8) {
        self.sr1 = layout.insert_bp(self.sr1, bp);
    }

    /// Set or clear the SEC bit
    pub const fn set_sec(&mut self, value: bool) {
        if value {
            self.sr1 |= opcodes::SR1_SEC;
        } else {
            self.sr1 &= !opcodes::SR1_SEC;
        }
    }

    /// Set or clear the TB bit
    pub const fn set_tb(&mut self, value: bool) {
        if value {
            self.sr1 |= opcodes::SR1_TB;
        } else {
            self.sr1 &= !opcodes::SR1_TB;
        }
    }

    /// Set or clear the SRP0 bit
    pub const fn set_srp0(&mut self, layout: &SrLayout, value: bool) {
        if value {
            self.sr1 |= layout.srp_mask();
        } else {
            self.sr1 &= !layout.srp_mask();
        }
    }

    /// Set or clear the SRP1 bit, a no-op without a second register
    pub const fn set_srp1(&mut self, value: bool) {
        if let Some(sr2) = self.sr2 {
            self.sr2 = Some(if value {
                sr2 | opcodes::SR2_SRP1
            } else {
                sr2 & !opcodes::SR2_SRP1
            });
        }
    }

    /// Set or clear an arbitrary bit of the second status register
    pub const fn set_sr2_bit(&mut self, pos: u8, value: bool) {
        if let Some(sr2) = self.sr2 {
            self.sr2 = Some(if value {
                sr2 | (1 << pos)
            } else {
                sr2 & !(1 << pos)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bp_mask_positions() {
        assert_eq!(SrLayout::new(2, 3, 7).bp_mask(), 0x1c);
        assert_eq!(SrLayout::new(2, 4, 7).bp_mask(), 0x3c);
        assert_eq!(SrLayout::new(2, 5, 7).bp_mask(), 0x7c);
    }

    #[test]
    fn bp_round_trip() {
        for layout in [
            SrLayout::new(2, 3, 7),
            SrLayout::new(2, 4, 7),
            SrLayout::new(2, 5, 7),
        ] {
            let max = (1u8 << layout.bp_bits) - 1;
            for bp in 0..=max {
                let sr1 = layout.insert_bp(0xff, bp);
                assert_eq!(layout.extract_bp(sr1), bp);
                // Bits outside the field stay untouched
                assert_eq!(sr1 & !layout.bp_mask(), 0xff & !layout.bp_mask());
            }
        }
    }

    #[test]
    fn mode_from_snapshot() {
        let layout = WINBOND_LAYOUT;

        let snap = StatusSnapshot::new(0x00, Some(0x00));
        assert_eq!(snap.mode(&layout), WpMode::Disabled);

        let snap = StatusSnapshot::new(0x80, Some(0x00));
        assert_eq!(snap.mode(&layout), WpMode::Hardware);

        let snap = StatusSnapshot::new(0x00, Some(0x01));
        assert_eq!(snap.mode(&layout), WpMode::PowerCycle);

        let snap = StatusSnapshot::new(0x80, Some(0x01));
        assert_eq!(snap.mode(&layout), WpMode::Permanent);

        // No SR2 means SRP1 always reads as 0
        let snap = StatusSnapshot::new(0x80, None);
        assert_eq!(snap.mode(&layout), WpMode::Hardware);
    }

    #[test]
    fn srp1_without_sr2_is_noop() {
        let mut snap = StatusSnapshot::new(0x00, None);
        snap.set_srp1(true);
        assert_eq!(snap.sr2, None);
        assert!(!snap.srp1());
    }

    #[test]
    fn setters_preserve_unrelated_bits() {
        let layout = WINBOND_LAYOUT;
        let mut snap = StatusSnapshot::new(0x03, Some(0x42));

        snap.set_bp(&layout, 0b101);
        snap.set_sec(true);
        snap.set_tb(true);
        snap.set_srp0(&layout, true);
        snap.set_srp1(true);

        assert!(snap.busy());
        assert!(snap.wel());
        assert_eq!(snap.bp(&layout), 0b101);
        assert!(snap.cmp());
        assert_eq!(snap.sr2, Some(0x43));
    }
}

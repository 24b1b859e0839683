//! Write protection operations
//!
//! This module provides functions to read, write, and manipulate
//! write protection settings on SPI flash chips. All status register
//! writes go through a single sequencer that verifies the protection
//! bits after the write, since chips silently ignore WRITE_SR1 while the
//! register is locked.

use super::codec::StatusSnapshot;
use super::resolver::{range_to_status, status_to_range};
use super::tables::{family_def, select_table, FamilyDef};
use super::types::{StatusRegister, WpConfig, WpMode, WpRange, WriteOptions};
use crate::chip::FlashChip;
use crate::error::Error;
use crate::programmer::SpiBus;
use crate::protocol::{self, StatusReg};
use maybe_async::maybe_async;

/// Settle time after WRITE_SR1, status writes are self-timed and expose no
/// busy indication on every chip
const STATUS_SETTLE_US: u32 = 100_000;

/// Write protection result type with detailed error information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WpError {
    /// Chip has no range table, protection state cannot be managed
    ChipUnsupported,
    /// Requested range is not supported by the chip
    RangeUnsupported,
    /// Requested mode is not supported by the chip
    ModeUnsupported,
    /// Written protection bits did not stick
    VerifyFailed {
        /// Which status byte failed verification
        reg: StatusRegister,
        /// Masked value that was written
        expected: u8,
        /// Masked value read back
        actual: u8,
    },
    /// The status register is locked by the given mode
    Locked(WpMode),
    /// Status bits do not decode to any known range
    UnsupportedState,
    /// SPI communication error
    SpiError(Error),
}

impl From<Error> for WpError {
    fn from(e: Error) -> Self {
        WpError::SpiError(e)
    }
}

impl core::fmt::Display for WpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WpError::ChipUnsupported => write!(f, "chip does not support write protection"),
            WpError::RangeUnsupported => write!(f, "requested range is not supported"),
            WpError::ModeUnsupported => write!(f, "requested mode is not supported"),
            WpError::VerifyFailed {
                reg,
                expected,
                actual,
            } => write!(
                f,
                "verify failed: {} has 0x{:02x}, expected 0x{:02x}",
                reg, actual, expected
            ),
            WpError::Locked(mode) => write!(f, "status register locked ({} protection)", mode),
            WpError::UnsupportedState => {
                write!(f, "status bits do not match any known range")
            }
            WpError::SpiError(e) => write!(f, "SPI error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WpError {}

/// Result type for write protection operations
pub type WpResult<T> = core::result::Result<T, WpError>;

fn family_for(chip: &FlashChip) -> WpResult<FamilyDef> {
    match chip.wp_family {
        Some(family) => Ok(family_def(family)),
        None => Err(WpError::ChipUnsupported),
    }
}

/// Capture the status bytes relevant to protection
#[maybe_async]
async fn read_snapshot<B: SpiBus + ?Sized>(
    bus: &mut B,
    def: &FamilyDef,
) -> WpResult<StatusSnapshot> {
    let sr1 = protocol::read_status(bus, StatusReg::Sr1).await?;
    let sr2 = if def.has_sr2 {
        Some(protocol::read_status(bus, StatusReg::Sr2).await?)
    } else {
        None
    };
    Ok(StatusSnapshot::new(sr1, sr2))
}

/// Write a snapshot to the chip and verify the protection bits stuck
///
/// Sends WRITE_ENABLE (or VOLATILE_SR_WRITE_ENABLE for a volatile write), issues a single WRITE_SR1
/// carrying both status bytes where the chip has two, waits out the
/// self-timed write, then reads back and compares under the family's
/// protection masks.
#[maybe_async]
async fn write_snapshot<B: SpiBus + ?Sized>(
    bus: &mut B,
    def: &FamilyDef,
    current: &StatusSnapshot,
    new: &StatusSnapshot,
    options: WriteOptions,
) -> WpResult<()> {
    if new == current {
        return Ok(());
    }

    if options.volatile {
        protocol::write_enable_volatile(bus).await?;
    } else {
        protocol::write_enable(bus).await?;
    }

    match new.sr2 {
        Some(sr2) => protocol::push_status(bus, &[new.sr1, sr2]).await?,
        None => protocol::push_status(bus, &[new.sr1]).await?,
    }

    bus.delay_us(STATUS_SETTLE_US).await;

    let readback = read_snapshot(bus, def).await?;

    let mask = def.sr1_mask();
    if readback.sr1 & mask != new.sr1 & mask {
        return Err(WpError::VerifyFailed {
            reg: StatusRegister::Status1,
            expected: new.sr1 & mask,
            actual: readback.sr1 & mask,
        });
    }

    let mask = def.sr2_mask();
    if mask != 0 {
        let expected = match new.sr2 {
            Some(sr2) => sr2 & mask,
            None => 0,
        };
        let actual = match readback.sr2 {
            Some(sr2) => sr2 & mask,
            None => 0,
        };
        if actual != expected {
            return Err(WpError::VerifyFailed {
                reg: StatusRegister::Status2,
                expected,
                actual,
            });
        }
    }

    Ok(())
}

/// Read the current write protection configuration
#[maybe_async]
pub async fn read_config<B: SpiBus + ?Sized>(
    bus: &mut B,
    chip: &FlashChip,
) -> WpResult<WpConfig> {
    let def = family_for(chip)?;
    let snap = read_snapshot(bus, &def).await?;
    let table = select_table(bus, &def, &snap).await?;

    let range = status_to_range(&def, table, &snap).ok_or(WpError::UnsupportedState)?;
    let mode = snap.mode(&def.layout);

    Ok(WpConfig::new(mode, range))
}

/// Set the protected range
///
/// The range must exactly match one of the chip's supported ranges.
/// The protection mode bits are left as they are.
#[maybe_async]
pub async fn set_range<B: SpiBus + ?Sized>(
    bus: &mut B,
    chip: &FlashChip,
    range: &WpRange,
    options: WriteOptions,
) -> WpResult<()> {
    let def = family_for(chip)?;
    let current = read_snapshot(bus, &def).await?;
    let table = select_table(bus, &def, &current).await?;

    let new = range_to_status(&def, table, &current, range).ok_or(WpError::RangeUnsupported)?;
    write_snapshot(bus, &def, &current, &new, options).await
}

/// Set the protection mode
///
/// `PowerCycle` and `Permanent` need a second status register. Entering
/// `PowerCycle` clears SRP0 first so only SRP1 ends up set; entering
/// `Permanent` sets SRP0 before SRP1 so a failure between the two writes
/// leaves the chip in hardware mode rather than power-cycle lock.
#[maybe_async]
pub async fn set_mode<B: SpiBus + ?Sized>(
    bus: &mut B,
    chip: &FlashChip,
    mode: WpMode,
    options: WriteOptions,
) -> WpResult<()> {
    let def = family_for(chip)?;

    match mode {
        WpMode::Disabled => disable_inner(bus, &def, options).await,
        WpMode::Hardware => {
            let snap = read_snapshot(bus, &def).await?;
            if snap.srp1() {
                return Err(WpError::Locked(snap.mode(&def.layout)));
            }
            if snap.srp0(&def.layout) {
                return Ok(());
            }
            let mut new = snap;
            new.set_srp0(&def.layout, true);
            write_snapshot(bus, &def, &snap, &new, options).await
        }
        WpMode::PowerCycle => {
            if !def.has_sr2 {
                return Err(WpError::ModeUnsupported);
            }
            let mut snap = read_snapshot(bus, &def).await?;
            if snap.srp0(&def.layout) {
                let mut cleared = snap;
                cleared.set_srp0(&def.layout, false);
                write_snapshot(bus, &def, &snap, &cleared, options).await?;
                snap = cleared;
            }
            if snap.srp1() {
                return Ok(());
            }
            let mut new = snap;
            new.set_srp1(true);
            write_snapshot(bus, &def, &snap, &new, options).await
        }
        WpMode::Permanent => {
            if !def.has_sr2 {
                return Err(WpError::ModeUnsupported);
            }
            let mut snap = read_snapshot(bus, &def).await?;
            if !snap.srp0(&def.layout) {
                let mut set0 = snap;
                set0.set_srp0(&def.layout, true);
                write_snapshot(bus, &def, &snap, &set0, options).await?;
                snap = set0;
            }
            if snap.srp1() {
                return Ok(());
            }
            let mut new = snap;
            new.set_srp1(true);
            write_snapshot(bus, &def, &snap, &new, options).await
        }
    }
}

/// Disable write protection
///
/// Only hardware mode can be left programmatically. Power-cycle
/// protection clears when power is removed; permanent protection never
/// clears.
#[maybe_async]
pub async fn disable<B: SpiBus + ?Sized>(
    bus: &mut B,
    chip: &FlashChip,
    options: WriteOptions,
) -> WpResult<()> {
    let def = family_for(chip)?;
    disable_inner(bus, &def, options).await
}

#[maybe_async]
async fn disable_inner<B: SpiBus + ?Sized>(
    bus: &mut B,
    def: &FamilyDef,
    options: WriteOptions,
) -> WpResult<()> {
    let snap = read_snapshot(bus, def).await?;
    match snap.mode(&def.layout) {
        WpMode::Disabled => Ok(()),
        WpMode::Hardware => {
            let mut new = snap;
            new.set_srp0(&def.layout, false);
            write_snapshot(bus, def, &snap, &new, options).await
        }
        mode @ (WpMode::PowerCycle | WpMode::Permanent) => Err(WpError::Locked(mode)),
    }
}

/// Enumerate the ranges a chip can protect
///
/// Ranges come back in table order with duplicates removed. The active
/// table is used, so the result reflects the current CMP or T/B
/// selection on chips that have one.
#[cfg(feature = "alloc")]
#[maybe_async]
pub async fn list_ranges<B: SpiBus + ?Sized>(
    bus: &mut B,
    chip: &FlashChip,
) -> WpResult<alloc::vec::Vec<WpRange>> {
    let def = family_for(chip)?;
    let snap = read_snapshot(bus, &def).await?;
    let table = select_table(bus, &def, &snap).await?;

    let mut ranges = alloc::vec::Vec::new();
    for entry in table {
        let range = WpRange::new(entry.start, entry.len);
        if !ranges.contains(&range) {
            ranges.push(range);
        }
    }
    Ok(ranges)
}

#[cfg(all(test, feature = "is_sync"))]
mod tests {
    use super::*;
    use crate::programmer::{SpiCaps, SpiBus};
    use crate::spi::{opcodes, SpiOp};

    /// Status-register-only flash model
    ///
    /// Honors the write-enable latch and an optional hardware lock that
    /// makes WRITE_SR1 a silent no-op, which is how real chips behave while
    /// SRP protection is in effect with WP# low.
    struct StatusFlash {
        sr1: u8,
        sr2: Option<u8>,
        wel: bool,
        locked: bool,
    }

    impl StatusFlash {
        fn new(sr1: u8, sr2: Option<u8>) -> Self {
            Self {
                sr1,
                sr2,
                wel: false,
                locked: false,
            }
        }
    }

    impl SpiBus for StatusFlash {
        fn caps(&self) -> SpiCaps {
            SpiCaps::default()
        }

        fn max_read(&self) -> usize {
            256
        }

        fn max_write(&self) -> usize {
            256
        }

        fn run(&mut self, cmd: &mut SpiOp<'_>) -> crate::error::Result<()> {
            match cmd.opcode {
                opcodes::READ_SR1 => cmd.rx[0] = self.sr1,
                opcodes::READ_SR2 => cmd.rx[0] = self.sr2.unwrap_or(0),
                opcodes::WRITE_ENABLE | opcodes::VOLATILE_SR_WRITE_ENABLE => self.wel = true,
                opcodes::WRITE_SR1 => {
                    if self.wel && !self.locked {
                        self.sr1 = cmd.tx[0];
                        if let (Some(_), Some(&b)) = (self.sr2, cmd.tx.get(1)) {
                            self.sr2 = Some(b);
                        }
                    }
                    self.wel = false;
                }
                _ => return Err(Error::UnsupportedOperation),
            }
            Ok(())
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    fn chip(name: &str) -> FlashChip {
        *crate::chip::find_by_name(name).unwrap()
    }

    #[test]
    fn read_config_decodes_mode_and_range() {
        // SRP0 set, BP=1, SEC=0, TB=0
        let mut flash = StatusFlash::new(0x84, Some(0x00));
        let chip = chip("W25Q16");

        let config = read_config(&mut flash, &chip).unwrap();
        assert_eq!(config.mode, WpMode::Hardware);
        assert_eq!(config.range, WpRange::new(0x1f0000, 64 * 1024));
    }

    #[test]
    fn read_config_needs_family() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        let mut chip = chip("W25Q16");
        chip.wp_family = None;

        assert_eq!(
            read_config(&mut flash, &chip).unwrap_err(),
            WpError::ChipUnsupported
        );
    }

    #[test]
    fn set_range_writes_and_verifies() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        let chip = chip("W25Q16");

        set_range(
            &mut flash,
            &chip,
            &WpRange::new(0x1f0000, 64 * 1024),
            WriteOptions::default(),
        )
        .unwrap();
        assert_eq!(flash.sr1, 0x04);

        let config = read_config(&mut flash, &chip).unwrap();
        assert_eq!(config.range, WpRange::new(0x1f0000, 64 * 1024));
    }

    #[test]
    fn set_range_rejects_unknown_range() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        let chip = chip("W25Q16");

        assert_eq!(
            set_range(
                &mut flash,
                &chip,
                &WpRange::new(0x1234, 0x1000),
                WriteOptions::default(),
            )
            .unwrap_err(),
            WpError::RangeUnsupported
        );
        // Nothing written
        assert_eq!(flash.sr1, 0x00);
    }

    #[test]
    fn set_range_detects_ignored_write() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        flash.locked = true;
        let chip = chip("W25Q16");

        let err = set_range(
            &mut flash,
            &chip,
            &WpRange::new(0x1f0000, 64 * 1024),
            WriteOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            WpError::VerifyFailed {
                reg: StatusRegister::Status1,
                expected: 0x04,
                actual: 0x00,
            }
        );
    }

    #[test]
    fn mode_transitions() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        let chip = chip("W25Q16");

        set_mode(&mut flash, &chip, WpMode::Hardware, WriteOptions::default()).unwrap();
        assert_eq!(flash.sr1 & 0x80, 0x80);

        disable(&mut flash, &chip, WriteOptions::default()).unwrap();
        assert_eq!(flash.sr1 & 0x80, 0x00);

        // Power-cycle mode ends with SRP1 set and SRP0 clear
        set_mode(&mut flash, &chip, WpMode::Hardware, WriteOptions::default()).unwrap();
        set_mode(
            &mut flash,
            &chip,
            WpMode::PowerCycle,
            WriteOptions::default(),
        )
        .unwrap();
        assert_eq!(flash.sr1 & 0x80, 0x00);
        assert_eq!(flash.sr2.unwrap() & 0x01, 0x01);
    }

    #[test]
    fn power_cycle_lock_cannot_be_disabled() {
        let mut flash = StatusFlash::new(0x00, Some(0x01));
        let chip = chip("W25Q16");

        assert_eq!(
            disable(&mut flash, &chip, WriteOptions::default()).unwrap_err(),
            WpError::Locked(WpMode::PowerCycle)
        );
        // Hardware mode is also refused while SRP1 is set
        assert_eq!(
            set_mode(&mut flash, &chip, WpMode::Hardware, WriteOptions::default()).unwrap_err(),
            WpError::Locked(WpMode::PowerCycle)
        );
    }

    #[test]
    fn permanent_sets_both_srp_bits() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        let chip = chip("W25Q16");

        set_mode(
            &mut flash,
            &chip,
            WpMode::Permanent,
            WriteOptions::default(),
        )
        .unwrap();
        assert_eq!(flash.sr1 & 0x80, 0x80);
        assert_eq!(flash.sr2.unwrap() & 0x01, 0x01);

        assert_eq!(
            disable(&mut flash, &chip, WriteOptions::default()).unwrap_err(),
            WpError::Locked(WpMode::Permanent)
        );
    }

    #[test]
    fn sr2_modes_need_second_register() {
        let mut flash = StatusFlash::new(0x00, None);
        let chip = chip("EN25F40");

        assert_eq!(
            set_mode(
                &mut flash,
                &chip,
                WpMode::PowerCycle,
                WriteOptions::default(),
            )
            .unwrap_err(),
            WpError::ModeUnsupported
        );
        assert_eq!(
            set_mode(
                &mut flash,
                &chip,
                WpMode::Permanent,
                WriteOptions::default(),
            )
            .unwrap_err(),
            WpError::ModeUnsupported
        );
    }

    #[test]
    fn list_ranges_dedupes() {
        let mut flash = StatusFlash::new(0x00, Some(0x00));
        let chip = chip("W25Q16");

        let ranges = list_ranges(&mut flash, &chip).unwrap();
        // 23 rows collapse to 19 distinct ranges
        assert_eq!(ranges.len(), 19);
        assert_eq!(ranges[0], WpRange::none());
        assert!(ranges.contains(&WpRange::new(0, 2048 * 1024)));
    }

    #[test]
    fn cmp_bit_selects_complement_table() {
        // W25Q128 with CMP set: BP=0 protects the whole chip
        let mut flash = StatusFlash::new(0x00, Some(0x40));
        let chip = chip("W25Q128");

        let config = read_config(&mut flash, &chip).unwrap();
        assert_eq!(config.range, WpRange::new(0, 16 * 1024 * 1024));
    }
}

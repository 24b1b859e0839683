//! In-memory flash chip for tests and development
//!
//! [`DummyFlash`] answers the JEDEC command set from a `Vec<u8>` so the
//! whole stack runs without hardware. Beyond plain array access it
//! models the parts of a Winbond style chip the protection code cares
//! about: the write enable latch, the status registers with their block
//! protect, top/bottom, sector, complement and SRP bits, and the
//! protected address range those bits impose on program and erase. An
//! external write protect pin can be asserted to make hardware
//! protection stick, and a fault knob drops status writes on the floor
//! so readback verification paths can be exercised.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use fwprog_core::error::{Error, Result};
use fwprog_core::programmer::{SpiBus, SpiCaps};
use fwprog_core::spi::{opcodes, SpiOp};
use fwprog_core::wp::WpRange;
use maybe_async::maybe_async;

/// SR1 bits that survive a status write. BUSY and WEL are hardware status.
const SR1_WRITABLE: u8 = !(opcodes::SR1_BUSY | opcodes::SR1_WEL);
/// SR2 bits that survive a status write. SUS is hardware status.
const SR2_WRITABLE: u8 = !opcodes::SR2_SUS;

/// Identity and geometry of the emulated part
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Array size in bytes
    pub size: usize,
    /// Program page size
    pub page_size: usize,
    /// Smallest erase unit
    pub sector_size: usize,
    /// External write protect pin. While asserted, SRP0 locks the
    /// status registers against further writes.
    pub wp_pin_asserted: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        // Winbond W25Q32, 4 MiB
        Self {
            manufacturer_id: 0xEF,
            device_id: 0x4016,
            size: 4 * 1024 * 1024,
            page_size: 256,
            sector_size: 4096,
            wp_pin_asserted: false,
        }
    }
}

/// Injectable misbehavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    /// Behave like a healthy chip
    #[default]
    None,
    /// Accept status write frames and consume the latch, but keep the
    /// old register values. Models a chip whose registers are locked
    /// without it saying so; only readback verification catches it.
    DropStatusWrites,
}

/// The emulated chip itself
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    sr1: u8,
    sr2: u8,
    sr3: u8,
    write_enabled: bool,
    status_write_enabled: bool,
    in_4byte_mode: bool,
    /// Fault injection knob, writable by tests
    pub fault: FaultMode,
}

impl DummyFlash {
    /// A blank (all 0xFF) chip with the given identity
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            sr1: 0,
            sr2: 0,
            sr3: 0,
            write_enabled: false,
            status_write_enabled: false,
            in_4byte_mode: false,
            fault: FaultMode::None,
        }
    }

    /// A blank chip with the default identity (W25Q32)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// A chip preloaded with `initial_data`, truncated to the array size
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = initial_data.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// The array contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the array contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The identity this chip was built with
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// SR1 as stored, without the live WEL bit
    pub fn status1(&self) -> u8 {
        self.sr1
    }

    /// SR2 as stored
    pub fn status2(&self) -> u8 {
        self.sr2
    }

    /// Whether the chip has been switched to 4-byte addressing
    pub fn in_4byte_mode(&self) -> bool {
        self.in_4byte_mode
    }

    /// Preload the status registers, bypassing the write enable
    /// handshake and any locking.
    pub fn set_status_registers(&mut self, sr1: u8, sr2: u8) {
        self.sr1 = sr1 & SR1_WRITABLE;
        self.sr2 = sr2 & SR2_WRITABLE;
    }

    /// Assert or release the external write protect pin
    pub fn set_wp_pin(&mut self, asserted: bool) {
        self.config.wp_pin_asserted = asserted;
    }

    /// Address range currently protected by the block protect bits
    ///
    /// Decoded the way the silicon does: the BP field selects a power
    /// of two span of 64K blocks (4K sectors when SEC is set, capped at
    /// 32K), TB places it at the bottom instead of the top, and CMP
    /// complements the result.
    pub fn protected_range(&self) -> WpRange {
        let total = self.config.size as u32;
        let bp = (self.sr1 >> 2) & 0x07;
        let base = if bp == 0 {
            WpRange::none()
        } else if bp == 0x07 {
            WpRange::full(total)
        } else {
            let sec = self.sr1 & opcodes::SR1_SEC != 0;
            let block: u32 = if sec { 4 * 1024 } else { 64 * 1024 };
            let mut len = block << (bp - 1);
            if sec {
                len = len.min(32 * 1024);
            }
            len = len.min(total);
            if self.sr1 & opcodes::SR1_TB != 0 {
                WpRange::new(0, len)
            } else {
                WpRange::new(total - len, len)
            }
        };
        if self.sr2 & opcodes::SR2_CMP == 0 {
            return base;
        }
        if base.len == 0 {
            WpRange::full(total)
        } else if base.start == 0 {
            WpRange::new(base.end(), total - base.end())
        } else {
            WpRange::new(0, base.start)
        }
    }

    /// Whether the status registers currently reject writes
    fn status_locked(&self) -> bool {
        if self.sr2 & opcodes::SR2_SRP1 != 0 {
            return true;
        }
        self.sr1 & opcodes::SR1_SRP0 != 0 && self.config.wp_pin_asserted
    }

    /// Consume the write enable latch, reporting whether it was set
    fn take_write_latch(&mut self) -> bool {
        core::mem::take(&mut self.write_enabled)
    }

    /// Consume either latch form, as a status write does
    fn take_status_latch(&mut self) -> bool {
        let latched = self.write_enabled || self.status_write_enabled;
        self.write_enabled = false;
        self.status_write_enabled = false;
        latched
    }

    /// Whether a status write may land right now
    fn status_write_allowed(&mut self) -> bool {
        self.take_status_latch() && !self.status_locked() && self.fault == FaultMode::None
    }

    fn protected_overlap(&self, addr: u32, len: usize) -> bool {
        let range = self.protected_range();
        let len = len as u32;
        range.len != 0 && len != 0 && addr < range.end() && range.start < addr + len
    }

    fn array_read(&mut self, op: &mut SpiOp<'_>) -> Result<()> {
        let addr = op.addr.unwrap_or(0) as usize;
        let len = op.rx.len();
        if addr + len > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        op.rx.copy_from_slice(&self.data[addr..addr + len]);
        Ok(())
    }

    fn page_program(&mut self, op: &SpiOp<'_>) -> Result<()> {
        if !self.take_write_latch() {
            // A real part ignores program commands without WEL.
            return Ok(());
        }

        let addr = op.addr.unwrap_or(0) as usize;
        if addr + op.tx.len() > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        if self.protected_overlap(addr as u32, op.tx.len()) {
            log::debug!(
                "program denied: 0x{:06x}+{} overlaps protected range",
                addr,
                op.tx.len()
            );
            return Err(Error::AccessDenied);
        }

        // Programming only pulls bits from 1 to 0.
        for (cell, &byte) in self.data[addr..].iter_mut().zip(op.tx) {
            *cell &= byte;
        }
        Ok(())
    }

    fn block_erase(&mut self, op: &SpiOp<'_>, block: usize) -> Result<()> {
        if !self.take_write_latch() {
            return Ok(());
        }

        let addr = op.addr.unwrap_or(0) as usize & !(block - 1);
        if addr + block > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        if self.protected_overlap(addr as u32, block) {
            log::debug!("erase denied: 0x{:06x} overlaps protected range", addr);
            return Err(Error::AccessDenied);
        }

        self.data[addr..addr + block].fill(0xFF);
        Ok(())
    }

    fn chip_erase(&mut self) -> Result<()> {
        if !self.take_write_latch() {
            return Ok(());
        }
        if self.protected_range().len != 0 {
            return Err(Error::AccessDenied);
        }
        self.data.fill(0xFF);
        Ok(())
    }

    fn status_write(&mut self, data: &[u8]) {
        if !self.status_write_allowed() {
            log::debug!("status write dropped");
            return;
        }
        if let Some(&b) = data.first() {
            self.sr1 = b & SR1_WRITABLE;
        }
        if let Some(&b) = data.get(1) {
            self.sr2 = b & SR2_WRITABLE;
        }
    }
}

#[maybe_async(AFIT)]
impl SpiBus for DummyFlash {
    fn caps(&self) -> SpiCaps {
        SpiCaps::FOUR_BYTE_ADDR
    }

    fn max_read(&self) -> usize {
        4096
    }

    fn max_write(&self) -> usize {
        self.config.page_size
    }

    async fn run(&mut self, op: &mut SpiOp<'_>) -> Result<()> {
        match op.opcode {
            opcodes::READ_JEDEC_ID => {
                if op.rx.len() >= 3 {
                    let [hi, lo] = self.config.device_id.to_be_bytes();
                    op.rx[0] = self.config.manufacturer_id;
                    op.rx[1] = hi;
                    op.rx[2] = lo;
                }
                Ok(())
            }

            opcodes::READ_SR1 => {
                if let Some(out) = op.rx.first_mut() {
                    let wel = if self.write_enabled {
                        opcodes::SR1_WEL
                    } else {
                        0
                    };
                    *out = self.sr1 | wel;
                }
                Ok(())
            }
            opcodes::READ_SR2 => {
                if let Some(out) = op.rx.first_mut() {
                    *out = self.sr2;
                }
                Ok(())
            }
            opcodes::READ_SR3 => {
                if let Some(out) = op.rx.first_mut() {
                    *out = self.sr3;
                }
                Ok(())
            }

            opcodes::WRITE_SR1 => {
                let tx = op.tx;
                self.status_write(tx);
                Ok(())
            }
            opcodes::WRITE_SR2 => {
                if self.status_write_allowed() {
                    if let Some(&b) = op.tx.first() {
                        self.sr2 = b & SR2_WRITABLE;
                    }
                }
                Ok(())
            }
            opcodes::WRITE_SR3 => {
                if self.status_write_allowed() {
                    if let Some(&b) = op.tx.first() {
                        self.sr3 = b;
                    }
                }
                Ok(())
            }

            opcodes::WRITE_ENABLE => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::WRITE_DISABLE => {
                self.write_enabled = false;
                self.status_write_enabled = false;
                Ok(())
            }
            opcodes::VOLATILE_SR_WRITE_ENABLE => {
                self.status_write_enabled = true;
                Ok(())
            }

            opcodes::READ_DATA
            | opcodes::FAST_READ
            | opcodes::READ_DATA_4B
            | opcodes::FAST_READ_4B => self.array_read(op),

            opcodes::PAGE_PROGRAM | opcodes::PAGE_PROGRAM_4B => self.page_program(op),

            opcodes::ERASE_SECTOR_4K | opcodes::ERASE_SECTOR_4K_4B => {
                self.block_erase(op, 4 * 1024)
            }
            opcodes::ERASE_BLOCK_32K | opcodes::ERASE_BLOCK_32K_4B => {
                self.block_erase(op, 32 * 1024)
            }
            opcodes::ERASE_BLOCK_64K | opcodes::ERASE_BLOCK_64K_4B => {
                self.block_erase(op, 64 * 1024)
            }
            opcodes::CHIP_ERASE | opcodes::CHIP_ERASE_ALT => self.chip_erase(),

            opcodes::ENTER_4BA => {
                self.in_4byte_mode = true;
                Ok(())
            }
            opcodes::EXIT_4BA => {
                self.in_4byte_mode = false;
                Ok(())
            }

            opcodes::RESET_ENABLE | opcodes::RESET_DEVICE => Ok(()),

            _ => Err(Error::OpcodeNotSupported),
        }
    }

    async fn delay_us(&mut self, _us: u32) {}
}

#[cfg(all(test, feature = "is_sync"))]
mod tests {
    use super::*;
    use fwprog_core::chip::WpFamily;
    use fwprog_core::protocol::{self, StatusReg};
    use fwprog_core::spi::AddrWidth;
    use fwprog_core::wp::{family_def, select_table, status_to_range, StatusSnapshot};

    fn program(flash: &mut DummyFlash, addr: u32, data: &[u8]) -> Result<()> {
        protocol::write_enable(flash)?;
        flash.run(&mut SpiOp::data_write(
            AddrWidth::Three,
            opcodes::PAGE_PROGRAM,
            addr,
            data,
        ))
    }

    fn erase_4k(flash: &mut DummyFlash, addr: u32) -> Result<()> {
        protocol::write_enable(flash)?;
        flash.run(&mut SpiOp::block_erase(
            AddrWidth::Three,
            opcodes::ERASE_SECTOR_4K,
            addr,
        ))
    }

    #[test]
    fn reports_its_jedec_id() {
        let mut flash = DummyFlash::new_default();
        assert_eq!(protocol::jedec_id(&mut flash).unwrap(), (0xEF, 0x4016));
    }

    #[test]
    fn programs_and_reads_back() {
        let mut flash = DummyFlash::new_default();

        let data = [0x12, 0x34, 0x56, 0x78];
        program(&mut flash, 0x1000, &data).unwrap();

        let mut buf = [0u8; 4];
        flash
            .run(&mut SpiOp::data_read(
                AddrWidth::Three,
                opcodes::READ_DATA,
                0x1000,
                &mut buf,
            ))
            .unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn sector_erase_restores_0xff() {
        let mut flash = DummyFlash::new_default();

        program(&mut flash, 0, &[0x00u8; 256]).unwrap();
        assert!(flash.data()[..256].iter().all(|&b| b == 0x00));

        erase_4k(&mut flash, 0).unwrap();
        assert!(flash.data()[..4096].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn program_without_enable_is_ignored() {
        let mut flash = DummyFlash::new_default();

        let data = [0x00u8; 16];
        flash
            .run(&mut SpiOp::data_write(
                AddrWidth::Three,
                opcodes::PAGE_PROGRAM,
                0,
                &data,
            ))
            .unwrap();

        assert!(flash.data()[..16].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn status_write_needs_a_latch() {
        let mut flash = DummyFlash::new_default();

        flash
            .run(&mut SpiOp::reg_write(opcodes::WRITE_SR1, &[0x04]))
            .unwrap();
        assert_eq!(flash.status1(), 0);

        protocol::write_enable(&mut flash).unwrap();
        flash
            .run(&mut SpiOp::reg_write(opcodes::WRITE_SR1, &[0x04]))
            .unwrap();
        assert_eq!(flash.status1(), 0x04);

        // The latch is consumed by the write.
        flash
            .run(&mut SpiOp::reg_write(opcodes::WRITE_SR1, &[0x08]))
            .unwrap();
        assert_eq!(flash.status1(), 0x04);
    }

    #[test]
    fn volatile_enable_latches_a_status_write() {
        let mut flash = DummyFlash::new_default();

        protocol::write_enable_volatile(&mut flash).unwrap();
        flash
            .run(&mut SpiOp::reg_write(opcodes::WRITE_SR1, &[0x0c, 0x00]))
            .unwrap();
        assert_eq!(flash.status1(), 0x0c);
    }

    #[test]
    fn block_protect_denies_program_and_erase() {
        let mut flash = DummyFlash::new_default();

        // BP=3, top 256K of the 4M array.
        protocol::update_status(&mut flash, &[0x0c, 0x00]).unwrap();
        assert_eq!(flash.protected_range(), WpRange::new(0x3c0000, 0x40000));

        let data = [0x00u8; 16];
        assert_eq!(program(&mut flash, 0x3f0000, &data), Err(Error::AccessDenied));
        assert_eq!(erase_4k(&mut flash, 0x3c0000), Err(Error::AccessDenied));

        // The bottom of the array stays writable.
        program(&mut flash, 0, &data).unwrap();
        assert!(flash.data()[..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn chip_erase_denied_while_protected() {
        let mut flash = DummyFlash::new_default();
        protocol::update_status(&mut flash, &[0x04, 0x00]).unwrap();

        protocol::write_enable(&mut flash).unwrap();
        assert_eq!(
            flash.run(&mut SpiOp::bare(opcodes::CHIP_ERASE)),
            Err(Error::AccessDenied)
        );
    }

    #[test]
    fn cmp_inverts_the_protected_span() {
        let mut flash = DummyFlash::new_default();

        // BP=1 top 64K, complemented: everything below it.
        flash.set_status_registers(0x04, opcodes::SR2_CMP);
        assert_eq!(flash.protected_range(), WpRange::new(0, 0x3f0000));

        let data = [0x00u8; 16];
        assert_eq!(program(&mut flash, 0, &data), Err(Error::AccessDenied));
        program(&mut flash, 0x3f0000, &data).unwrap();
    }

    #[test]
    fn hardware_pin_locks_the_status_registers() {
        let mut flash = DummyFlash::new_default();
        flash.set_wp_pin(true);

        protocol::update_status(&mut flash, &[0x84, 0x00]).unwrap();
        assert_eq!(flash.status1(), 0x84);

        // SRP0 plus the asserted pin rejects any further change.
        protocol::update_status(&mut flash, &[0x00, 0x00]).unwrap();
        assert_eq!(flash.status1(), 0x84);

        flash.set_wp_pin(false);
        protocol::update_status(&mut flash, &[0x00, 0x00]).unwrap();
        assert_eq!(flash.status1(), 0x00);
    }

    #[test]
    fn srp1_locks_until_power_cycle() {
        let mut flash = DummyFlash::new_default();
        flash.set_status_registers(0x04, opcodes::SR2_SRP1);

        protocol::update_status(&mut flash, &[0x00, 0x00]).unwrap();
        assert_eq!(flash.status1(), 0x04);
        assert_eq!(flash.status2(), opcodes::SR2_SRP1);
    }

    #[test]
    fn dropped_status_writes_surface_in_readback() {
        let mut flash = DummyFlash::new_default();
        flash.fault = FaultMode::DropStatusWrites;

        protocol::update_status(&mut flash, &[0x0c, 0x00]).unwrap();
        assert_eq!(
            protocol::read_status(&mut flash, StatusReg::Sr1).unwrap(),
            0x00
        );
    }

    #[test]
    fn four_byte_mode_tracks_the_commands() {
        let mut flash = DummyFlash::new_default();
        protocol::enter_4ba(&mut flash).unwrap();
        assert!(flash.in_4byte_mode());
        protocol::leave_4ba(&mut flash).unwrap();
        assert!(!flash.in_4byte_mode());
    }

    #[test]
    fn protection_agrees_with_the_range_tables() {
        let mut flash = DummyFlash::new_default();
        let def = family_def(WpFamily::W25q32);

        let mut sr1_values = vec![0x00u8, 0x1c, 0x7c];
        for bp in 1..=6u8 {
            sr1_values.push(bp << 2); // sec=0 tb=0
            sr1_values.push(opcodes::SR1_TB | (bp << 2)); // sec=0 tb=1
        }
        for bp in 1..=5u8 {
            sr1_values.push(opcodes::SR1_SEC | (bp << 2));
            sr1_values.push(opcodes::SR1_SEC | opcodes::SR1_TB | (bp << 2));
        }

        for sr1 in sr1_values {
            flash.set_status_registers(sr1, 0);
            let snap = StatusSnapshot::new(sr1, Some(0));
            let table = select_table(&mut flash, &def, &snap).unwrap();
            let from_table = status_to_range(&def, table, &snap);
            assert_eq!(
                from_table,
                Some(flash.protected_range()),
                "sr1 = {sr1:#04x}"
            );
        }
    }
}

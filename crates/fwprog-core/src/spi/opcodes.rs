//! JEDEC SPI NOR opcode and status bit values
//!
//! Values every vendor agrees on. Chip-specific opcodes live in the chip
//! database entries, not here.

// --- write latch control ---

/// Set the write enable latch
pub const WRITE_ENABLE: u8 = 0x06;
/// Clear the write enable latch
pub const WRITE_DISABLE: u8 = 0x04;
/// Arm a volatile status register write (SST lineage, 0x50)
pub const VOLATILE_SR_WRITE_ENABLE: u8 = 0x50;

// --- status and configuration registers ---

/// Read status register 1
pub const READ_SR1: u8 = 0x05;
/// Read status register 2 (Winbond lineage)
pub const READ_SR2: u8 = 0x35;
/// Read status register 3 (Winbond lineage)
pub const READ_SR3: u8 = 0x15;
/// Read configuration register (Macronix, same opcode as READ_SR3)
pub const READ_CFG: u8 = 0x15;
/// Write status register 1, optionally chained with SR2
pub const WRITE_SR1: u8 = 0x01;
/// Write status register 2 alone
pub const WRITE_SR2: u8 = 0x31;
/// Write status register 3 alone
pub const WRITE_SR3: u8 = 0x11;

// --- identification ---

/// Read the JEDEC manufacturer and device id
pub const READ_JEDEC_ID: u8 = 0x9F;

// --- array read ---

/// Slow read, 24-bit address, no dummy cycles
pub const READ_DATA: u8 = 0x03;
/// Fast read, 24-bit address, 8 dummy cycles
pub const FAST_READ: u8 = 0x0B;
/// Slow read with a native 32-bit address
pub const READ_DATA_4B: u8 = 0x13;
/// Fast read with a native 32-bit address
pub const FAST_READ_4B: u8 = 0x0C;

// --- array program ---

/// Page program, 24-bit address
pub const PAGE_PROGRAM: u8 = 0x02;
/// Page program with a native 32-bit address
pub const PAGE_PROGRAM_4B: u8 = 0x12;

// --- erase ---

/// 4 KiB sector erase
pub const ERASE_SECTOR_4K: u8 = 0x20;
/// 32 KiB block erase
pub const ERASE_BLOCK_32K: u8 = 0x52;
/// 64 KiB block erase
pub const ERASE_BLOCK_64K: u8 = 0xD8;
/// Whole-chip erase, alternate encoding some vendors use
pub const CHIP_ERASE_ALT: u8 = 0x60;
/// Whole-chip erase
pub const CHIP_ERASE: u8 = 0xC7;
/// 4 KiB sector erase, native 32-bit address
pub const ERASE_SECTOR_4K_4B: u8 = 0x21;
/// 32 KiB block erase, native 32-bit address
pub const ERASE_BLOCK_32K_4B: u8 = 0x5C;
/// 64 KiB block erase, native 32-bit address
pub const ERASE_BLOCK_64K_4B: u8 = 0xDC;

// --- address mode switching ---

/// Switch the chip into 4-byte address mode
pub const ENTER_4BA: u8 = 0xB7;
/// Switch the chip back to 3-byte address mode
pub const EXIT_4BA: u8 = 0xE9;

// --- reset ---

/// Arm a software reset
pub const RESET_ENABLE: u8 = 0x66;
/// Execute the armed reset
pub const RESET_DEVICE: u8 = 0x99;

// --- status register 1 bits ---

/// Erase or program in progress
pub const SR1_BUSY: u8 = 0x01;
/// Write enable latch
pub const SR1_WEL: u8 = 0x02;
/// Block protect bit 0
pub const SR1_BP0: u8 = 0x04;
/// Block protect bit 1
pub const SR1_BP1: u8 = 0x08;
/// Block protect bit 2
pub const SR1_BP2: u8 = 0x10;
/// Protect from bottom instead of top
pub const SR1_TB: u8 = 0x20;
/// Protect 4 KiB sectors instead of 64 KiB blocks
pub const SR1_SEC: u8 = 0x40;
/// Status register protect bit 0
pub const SR1_SRP0: u8 = 0x80;

// --- status register 2 bits ---

/// Status register protect bit 1
pub const SR2_SRP1: u8 = 0x01;
/// Quad enable
pub const SR2_QE: u8 = 0x02;
/// Invert the protected range
pub const SR2_CMP: u8 = 0x40;
/// Erase or program suspended
pub const SR2_SUS: u8 = 0x80;

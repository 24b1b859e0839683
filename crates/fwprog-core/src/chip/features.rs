//! Flash chip feature flags

use bitflags::bitflags;

bitflags! {
    /// Feature flags for flash chips
    ///
    /// These flags describe what capabilities and behaviors a flash chip has.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "std", serde(transparent))]
    pub struct Features: u32 {
        // Write enable behavior
        /// Use WRITE_ENABLE (0x06) before WRITE_SR1
        const WRSR_WREN       = 1 << 0;
        /// Use VOLATILE_SR_WRITE_ENABLE (0x50) before WRITE_SR1 (legacy SST)
        const WRSR_EWSR       = 1 << 1;
        /// WRITE_SR1 writes both SR1 and SR2 with one command
        const WRSR_EXT        = 1 << 2;

        // Read capabilities
        /// Supports Fast Read (0x0B)
        const FAST_READ       = 1 << 3;

        // 4-byte addressing
        /// Supports 4-byte address mode
        const FOUR_BYTE_ADDR  = 1 << 4;
        /// Can enter 4BA mode with ENTER_4BA (0xB7)
        const FOUR_BYTE_ENTER = 1 << 5;
        /// Has native 4BA commands (0x13, 0x12, etc.)
        const FOUR_BYTE_NATIVE = 1 << 6;

        // Erase behavior
        /// Has 4KB sector erase
        const ERASE_4K        = 1 << 7;
        /// Has 32KB block erase
        const ERASE_32K       = 1 << 8;
        /// Has 64KB block erase
        const ERASE_64K       = 1 << 9;

        // Status register features
        /// Has status register 2
        const STATUS_REG_2    = 1 << 10;
        /// Has status register 3
        const STATUS_REG_3    = 1 << 11;

        // Write protection
        /// Top/Bottom protect bit available
        const WP_TB           = 1 << 12;
        /// Sector/Block protect bit available
        const WP_SEC          = 1 << 13;
        /// Complement (CMP) bit available
        const WP_CMP          = 1 << 14;
        /// Has Status Register Protect 1 (SRP1) bit
        const WP_SRP1         = 1 << 15;
        /// Supports volatile status register writes (VOLATILE_SR_WRITE_ENABLE)
        const WP_VOLATILE     = 1 << 16;
        /// Top/Bottom selection lives in the configuration register
        const WP_TB_CONFIG    = 1 << 17;
    }
}

impl Default for Features {
    fn default() -> Self {
        Features::empty()
    }
}

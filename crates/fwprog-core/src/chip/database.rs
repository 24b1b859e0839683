//! Built-in flash chip database
//!
//! A reduced database covering the chip families whose write protection
//! scheme is known to this crate. Entries are compiled in; no runtime
//! loading.

use super::{manufacturer, EraseBlock, Features, FlashChip, WpFamily, WriteGranularity};

const KIB: u32 = 1024;
const MIB: u32 = 1024 * 1024;

const ERASE_4K_32K_64K: &[EraseBlock] = &[
    EraseBlock::new(crate::spi::ERASE_SECTOR_4K, 4 * KIB),
    EraseBlock::new(crate::spi::ERASE_BLOCK_32K, 32 * KIB),
    EraseBlock::new(crate::spi::ERASE_BLOCK_64K, 64 * KIB),
];

const ERASE_4K_64K: &[EraseBlock] = &[
    EraseBlock::new(crate::spi::ERASE_SECTOR_4K, 4 * KIB),
    EraseBlock::new(crate::spi::ERASE_BLOCK_64K, 64 * KIB),
];

const ERASE_64K: &[EraseBlock] = &[EraseBlock::new(crate::spi::ERASE_BLOCK_64K, 64 * KIB)];

const W25Q_FEATURES: Features = Features::WRSR_WREN
    .union(Features::WRSR_EXT)
    .union(Features::FAST_READ)
    .union(Features::ERASE_4K)
    .union(Features::ERASE_32K)
    .union(Features::ERASE_64K)
    .union(Features::STATUS_REG_2)
    .union(Features::WP_TB)
    .union(Features::WP_SEC)
    .union(Features::WP_SRP1);

const GD25Q_FEATURES: Features = Features::WRSR_WREN
    .union(Features::WRSR_EXT)
    .union(Features::FAST_READ)
    .union(Features::ERASE_4K)
    .union(Features::ERASE_32K)
    .union(Features::ERASE_64K)
    .union(Features::STATUS_REG_2)
    .union(Features::WP_CMP)
    .union(Features::WP_SRP1);

/// All chips known to this crate
pub const CHIPS: &[FlashChip] = &[
    FlashChip {
        vendor: "Winbond",
        name: "W25Q80",
        manufacturer_id: manufacturer::WINBOND,
        model_id: 0x4014,
        total_size: MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: W25Q_FEATURES,
        wp_family: Some(WpFamily::W25q80),
    },
    FlashChip {
        vendor: "Winbond",
        name: "W25Q16",
        manufacturer_id: manufacturer::WINBOND,
        model_id: 0x4015,
        total_size: 2 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: W25Q_FEATURES,
        wp_family: Some(WpFamily::W25q16),
    },
    FlashChip {
        vendor: "Winbond",
        name: "W25Q32",
        manufacturer_id: manufacturer::WINBOND,
        model_id: 0x4016,
        total_size: 4 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: W25Q_FEATURES,
        wp_family: Some(WpFamily::W25q32),
    },
    FlashChip {
        vendor: "Winbond",
        name: "W25Q64",
        manufacturer_id: manufacturer::WINBOND,
        model_id: 0x4017,
        total_size: 8 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: W25Q_FEATURES,
        wp_family: Some(WpFamily::W25q64),
    },
    FlashChip {
        vendor: "Winbond",
        name: "W25Q128",
        manufacturer_id: manufacturer::WINBOND,
        model_id: 0x4018,
        total_size: 16 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: W25Q_FEATURES.union(Features::WP_CMP).union(Features::STATUS_REG_3),
        wp_family: Some(WpFamily::W25q128),
    },
    FlashChip {
        vendor: "GigaDevice",
        name: "GD25Q32",
        manufacturer_id: manufacturer::GIGADEVICE,
        model_id: 0x4016,
        total_size: 4 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: GD25Q_FEATURES,
        wp_family: Some(WpFamily::Gd25q32),
    },
    FlashChip {
        vendor: "GigaDevice",
        name: "GD25Q128",
        manufacturer_id: manufacturer::GIGADEVICE,
        model_id: 0x4018,
        total_size: 16 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: GD25Q_FEATURES.union(Features::STATUS_REG_3),
        wp_family: Some(WpFamily::Gd25q128),
    },
    FlashChip {
        vendor: "Macronix",
        name: "MX25L6406E",
        manufacturer_id: manufacturer::MACRONIX,
        model_id: 0x2017,
        total_size: 8 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::FAST_READ)
            .union(Features::ERASE_4K)
            .union(Features::ERASE_64K),
        wp_family: Some(WpFamily::Mx25l6406e),
    },
    FlashChip {
        vendor: "Macronix",
        name: "MX25L6495F",
        manufacturer_id: manufacturer::MACRONIX,
        model_id: 0x9517,
        total_size: 8 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_32K_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::FAST_READ)
            .union(Features::ERASE_4K)
            .union(Features::ERASE_32K)
            .union(Features::ERASE_64K)
            .union(Features::WP_TB_CONFIG),
        wp_family: Some(WpFamily::Mx25l6495f),
    },
    FlashChip {
        vendor: "Eon",
        name: "EN25F40",
        manufacturer_id: manufacturer::EON,
        model_id: 0x3113,
        total_size: 512 * KIB,
        page_size: 256,
        erase_blocks: ERASE_4K_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::FAST_READ)
            .union(Features::ERASE_4K)
            .union(Features::ERASE_64K),
        wp_family: Some(WpFamily::En25f40),
    },
    FlashChip {
        vendor: "Eon",
        name: "EN25Q64",
        manufacturer_id: manufacturer::EON,
        model_id: 0x3017,
        total_size: 8 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::FAST_READ)
            .union(Features::ERASE_4K)
            .union(Features::ERASE_64K)
            .union(Features::WP_TB),
        wp_family: Some(WpFamily::En25q64),
    },
    FlashChip {
        vendor: "Numonyx",
        name: "N25Q064",
        manufacturer_id: manufacturer::ST,
        model_id: 0xBA17,
        total_size: 8 * MIB,
        page_size: 256,
        erase_blocks: ERASE_4K_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::FAST_READ)
            .union(Features::ERASE_4K)
            .union(Features::ERASE_64K)
            .union(Features::WP_TB)
            .union(Features::WP_SEC),
        wp_family: Some(WpFamily::N25q064),
    },
    FlashChip {
        vendor: "AMIC",
        name: "A25L040",
        manufacturer_id: manufacturer::AMIC,
        model_id: 0x3013,
        total_size: 512 * KIB,
        page_size: 256,
        erase_blocks: ERASE_4K_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::FAST_READ)
            .union(Features::ERASE_4K)
            .union(Features::ERASE_64K),
        wp_family: Some(WpFamily::A25l040),
    },
    FlashChip {
        vendor: "Spansion",
        name: "S25FS128S",
        manufacturer_id: manufacturer::SPANSION,
        model_id: 0x2018,
        total_size: 16 * MIB,
        page_size: 256,
        erase_blocks: ERASE_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::WRSR_EXT)
            .union(Features::FAST_READ)
            .union(Features::ERASE_64K)
            .union(Features::STATUS_REG_2)
            .union(Features::WP_TB_CONFIG),
        wp_family: Some(WpFamily::S25fs128s),
    },
    FlashChip {
        vendor: "Spansion",
        name: "S25FL256S",
        manufacturer_id: manufacturer::SPANSION,
        model_id: 0x0219,
        total_size: 32 * MIB,
        page_size: 256,
        erase_blocks: ERASE_64K,
        write_granularity: WriteGranularity::Page,
        features: Features::WRSR_WREN
            .union(Features::WRSR_EXT)
            .union(Features::FAST_READ)
            .union(Features::ERASE_64K)
            .union(Features::STATUS_REG_2)
            .union(Features::WP_TB_CONFIG)
            .union(Features::FOUR_BYTE_ADDR)
            .union(Features::FOUR_BYTE_ENTER)
            .union(Features::FOUR_BYTE_NATIVE),
        wp_family: Some(WpFamily::S25fl256s),
    },
];

/// Look up a chip by its JEDEC ID
pub fn find_by_jedec_id(manufacturer_id: u8, model_id: u16) -> Option<&'static FlashChip> {
    CHIPS
        .iter()
        .find(|c| c.matches_jedec_id(manufacturer_id, model_id))
}

/// Look up a chip by name (case-insensitive)
pub fn find_by_name(name: &str) -> Option<&'static FlashChip> {
    CHIPS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jedec_lookup_finds_w25q128() {
        let chip = find_by_jedec_id(0xEF, 0x4018).unwrap();
        assert_eq!(chip.name, "W25Q128");
        assert_eq!(chip.total_size, 16 * MIB);
        assert_eq!(chip.wp_family, Some(WpFamily::W25q128));
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        assert!(find_by_name("gd25q32").is_some());
        assert!(find_by_name("GD25Q32").is_some());
        assert!(find_by_name("nonesuch").is_none());
    }

    #[test]
    fn no_duplicate_jedec_ids() {
        for (i, a) in CHIPS.iter().enumerate() {
            for b in &CHIPS[i + 1..] {
                assert!(
                    !(a.manufacturer_id == b.manufacturer_id && a.model_id == b.model_id),
                    "duplicate id for {} and {}",
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn erase_block_selection_prefers_largest_aligned() {
        let chip = find_by_name("W25Q64").unwrap();
        let block = chip.erase_block_for(0x10000, 0x20000).unwrap();
        assert_eq!(block.size, 64 * KIB);
        let block = chip.erase_block_for(0x1000, 0x1000).unwrap();
        assert_eq!(block.size, 4 * KIB);
    }
}

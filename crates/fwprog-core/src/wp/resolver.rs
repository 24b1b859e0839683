//! Range resolution
//!
//! Translates between status register snapshots and protected ranges
//! using the family range tables. Both directions scan the table in
//! declaration order and take the first matching row.

use super::codec::StatusSnapshot;
use super::tables::{FamilyDef, MatchStyle, RangeEntry};
use super::types::WpRange;

/// Decode the protected range from a status snapshot
///
/// Returns `None` when no table row matches the current bits.
pub fn status_to_range(
    def: &FamilyDef,
    table: &[RangeEntry],
    snap: &StatusSnapshot,
) -> Option<WpRange> {
    let bp = snap.bp(&def.layout);
    let entry = match def.style {
        MatchStyle::SecTb => table
            .iter()
            .find(|e| e.bp == bp && e.sec.matches(snap.sec()) && e.tb.matches(snap.tb())),
        MatchStyle::Bp => table.iter().find(|e| {
            let modifier_ok = match def.modifier_bit {
                Some(bit) => e.tb.matches(snap.sr2_bit(bit)),
                None => true,
            };
            modifier_ok && e.bp == bp
        }),
    };

    entry.map(|e| WpRange::new(e.start, e.len))
}

/// Encode a requested range into status register bits
///
/// The result is derived from the current snapshot so bits outside the
/// protection fields keep their value. Rows with a don't-care SEC or TB
/// state leave the current bit alone. Returns `None` when the table has
/// no row for exactly this range.
pub fn range_to_status(
    def: &FamilyDef,
    table: &[RangeEntry],
    current: &StatusSnapshot,
    range: &WpRange,
) -> Option<StatusSnapshot> {
    let entry = table
        .iter()
        .find(|e| e.start == range.start && e.len == range.len)?;

    let mut snap = *current;
    snap.set_bp(&def.layout, entry.bp);

    match def.style {
        MatchStyle::SecTb => {
            if let Some(sec) = entry.sec.value() {
                snap.set_sec(sec);
            }
            if let Some(tb) = entry.tb.value() {
                snap.set_tb(tb);
            }
        }
        MatchStyle::Bp => {
            if let Some(bit) = def.modifier_bit {
                if let Some(value) = entry.tb.value() {
                    snap.set_sr2_bit(bit, value);
                }
            }
        }
    }

    Some(snap)
}

/// Check whether a range appears in a table
pub fn table_has_range(table: &[RangeEntry], range: &WpRange) -> bool {
    table
        .iter()
        .any(|e| e.start == range.start && e.len == range.len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::WpFamily;
    use crate::wp::tables::{family_def, TableSelect};

    fn fixed_table(def: &FamilyDef) -> &'static [RangeEntry] {
        match def.select {
            TableSelect::Fixed(t) => t,
            TableSelect::Cmp { cmp0, .. } => cmp0,
            TableSelect::ConfigTb { tb0, .. } => tb0,
        }
    }

    #[test]
    fn winbond_decode() {
        let def = family_def(WpFamily::W25q16);
        let table = fixed_table(&def);

        // BP=1, SEC=0, TB=0: upper 64 KiB
        let snap = StatusSnapshot::new(0x04, Some(0x00));
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0x1f0000, 64 * 1024))
        );

        // BP=1, SEC=0, TB=1: lower 64 KiB
        let snap = StatusSnapshot::new(0x24, Some(0x00));
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0, 64 * 1024))
        );

        // BP=1, SEC=1, TB=0: upper 4 KiB
        let snap = StatusSnapshot::new(0x44, Some(0x00));
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0x1ff000, 4 * 1024))
        );
    }

    #[test]
    fn winbond_decode_wildcard_rows() {
        let def = family_def(WpFamily::W25q16);
        let table = fixed_table(&def);

        // BP=7 protects the whole chip regardless of SEC and TB
        for sr1 in [0x1c, 0x3c, 0x5c, 0x7c] {
            let snap = StatusSnapshot::new(sr1, Some(0x00));
            assert_eq!(
                status_to_range(&def, table, &snap),
                Some(WpRange::new(0, 2048 * 1024))
            );
        }
    }

    #[test]
    fn winbond_encode() {
        let def = family_def(WpFamily::W25q16);
        let table = fixed_table(&def);

        let current = StatusSnapshot::new(0x00, Some(0x00));
        let snap = range_to_status(&def, table, &current, &WpRange::new(0x1f0000, 64 * 1024))
            .unwrap();
        assert_eq!(snap.sr1, 0x04);

        let snap =
            range_to_status(&def, table, &current, &WpRange::new(0, 1024 * 1024)).unwrap();
        // BP=5, TB=1
        assert_eq!(snap.sr1, 0x34);
    }

    #[test]
    fn encode_preserves_unrelated_bits() {
        let def = family_def(WpFamily::W25q16);
        let table = fixed_table(&def);

        // WIP, WEL and SRP0 survive an encode
        let current = StatusSnapshot::new(0x83, Some(0x42));
        let snap = range_to_status(&def, table, &current, &WpRange::new(0x1f0000, 64 * 1024))
            .unwrap();
        assert_eq!(snap.sr1 & 0x83, 0x83);
        assert_eq!(snap.sr2, Some(0x42));
    }

    #[test]
    fn encode_none_leaves_dont_care_bits() {
        let def = family_def(WpFamily::W25q16);
        let table = fixed_table(&def);

        // The "none" row has wildcard SEC and TB, both stay set
        let current = StatusSnapshot::new(0x64, Some(0x00));
        let snap = range_to_status(&def, table, &current, &WpRange::none()).unwrap();
        assert_eq!(snap.sr1, 0x60);
    }

    #[test]
    fn encode_unsupported_range() {
        let def = family_def(WpFamily::W25q16);
        let table = fixed_table(&def);

        let current = StatusSnapshot::new(0x00, Some(0x00));
        assert!(range_to_status(&def, table, &current, &WpRange::new(0x1000, 0x1000)).is_none());
        assert!(!table_has_range(table, &WpRange::new(0x1000, 0x1000)));
    }

    #[test]
    fn gigadevice_ignores_sec_and_tb() {
        let def = family_def(WpFamily::Gd25q32);
        let table = fixed_table(&def);

        // BP field spans bits 2-6, so what Winbond calls SEC is BP4 here
        let snap = StatusSnapshot::new(0x11 << 2, Some(0x00));
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0x3ff000, 4 * 1024))
        );
    }

    #[test]
    fn spansion_tbprot_selects_direction() {
        let def = family_def(WpFamily::S25fl256s);
        let table = fixed_table(&def);

        // TBPROT=1: BP counts from the bottom
        let snap = StatusSnapshot::new(0x04, Some(0x20));
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0, 512 * 1024))
        );

        // TBPROT=0: BP counts from the top
        let snap = StatusSnapshot::new(0x04, Some(0x00));
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0x1f80000, 512 * 1024))
        );
    }

    #[test]
    fn n25q064_block_and_chip_rows() {
        let def = family_def(WpFamily::N25q064);
        let table = fixed_table(&def);

        // SEC=0, TB=1, BP=1: block 0
        let snap = StatusSnapshot::new(0x24, None);
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0, 64 * 1024))
        );

        // SEC=1, TB=1, BP=0: whole chip
        let snap = StatusSnapshot::new(0x60, None);
        assert_eq!(
            status_to_range(&def, table, &snap),
            Some(WpRange::new(0, 8192 * 1024))
        );
    }
}

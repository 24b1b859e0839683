//! SPI flash write protection
//!
//! NOR flash chips protect a region of the array through block-protect
//! bits in their status registers, with an SRP bit pair deciding when
//! the registers themselves can be rewritten. Which bit patterns map to
//! which region is not discoverable from the chip; it comes from
//! per-family tables in this module.
//!
//! The entry points operate on a [`crate::chip::FlashChip`] whose
//! `wp_family` is known:
//!
//! - [`read_config`] decodes the current mode and protected range
//! - [`set_range`] selects one of the chip's supported ranges
//! - [`set_mode`] and [`disable`] drive the SRP bits
//! - [`list_ranges`] enumerates what the chip can protect
//!
//! All writes verify the protection bits afterwards, since a chip with
//! a locked status register ignores WRITE_SR1 without reporting an error.

mod codec;
mod ops;
mod resolver;
mod tables;
mod types;

pub use codec::{SrLayout, StatusSnapshot, WINBOND_LAYOUT};
pub use ops::*;
pub use resolver::{range_to_status, status_to_range, table_has_range};
pub use tables::{family_def, select_table, FamilyDef, MatchStyle, RangeEntry, TableSelect};
pub use types::*;

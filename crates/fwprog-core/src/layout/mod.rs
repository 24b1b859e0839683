//! Named regions over the flash array
//!
//! A [`Layout`] splits a chip into named [`Region`]s, either decoded
//! from an FMAP embedded in the image or assembled by hand. Regions are
//! selected for an operation with include/exclude filtering:
//!
//! ```ignore
//! let mut layout = Layout::from_fmap(&image)?;
//! layout.include_region("RW_SECTION_A")?;
//! ```

mod fmap;
mod types;

pub use fmap::{fmap_offset, has_fmap, parse_fmap, parse_fmap_at};
pub use types::*;

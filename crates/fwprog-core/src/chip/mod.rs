//! Chip descriptors and the built-in database
//!
//! A [`FlashChip`] captures everything probe and protection code needs
//! to know about one part: identity, geometry, erase methods, feature
//! flags and the protection family it decodes its BP bits with.

pub(crate) mod database;
mod features;
mod types;

pub use database::{find_by_jedec_id, find_by_name, CHIPS};
pub use features::Features;
pub use types::*;

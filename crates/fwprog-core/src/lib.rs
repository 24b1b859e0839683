//! Flash programming and write protection, `no_std` first
//!
//! Everything needed to drive a SPI NOR chip lives here: the wire-level
//! command layer, the chip database, read/write/erase with change
//! detection, flash layouts, and the write protection machinery built
//! on the status register range tables.
//!
//! The crate is `no_std` by default. The `alloc` feature unlocks
//! layouts, smart writes and protection range listings; `std` adds
//! `std::error::Error` impls on top. With `is_sync` every async surface
//! compiles down to blocking calls.
//!
//! ```ignore
//! use fwprog_core::flash::{self, FlashDevice, SpiFlashDevice};
//!
//! let probed = flash::probe(&mut bus)?;
//! log::info!("found {} {}", probed.chip.vendor, probed.chip.name);
//! let mut device = SpiFlashDevice::new(bus, probed);
//! device.erase(0, device.min_erase_size())?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// maybe-async expands to plain async traits in async mode
#![allow(async_fn_in_trait)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod error;
pub mod flash;
#[cfg(feature = "alloc")]
pub mod layout;
pub mod programmer;
pub mod protocol;
pub mod spi;
pub mod wp;

pub use error::{Error, Result};

//! Flash device layer
//!
//! The [`FlashDevice`] trait gives read, write, erase and protection
//! operations a single surface to target. [`SpiFlashDevice`] implements
//! it on top of a raw SPI bus and a probed chip, [`OpaqueFlashDevice`]
//! on top of a programmer that hides the protocol.

mod device;
mod opaque_device;
mod operations;
mod probed;
mod spi_device;

pub use device::{FlashDevice, FlashDeviceExt};
pub use opaque_device::OpaqueFlashDevice;
pub use operations::*;
pub use probed::{AddrMode, ProbedChip};
pub use spi_device::SpiFlashDevice;

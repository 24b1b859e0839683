//! EC-mediated flash access
//!
//! Some boards put their firmware flash behind an embedded controller
//! instead of wiring it to a programmer directly. The EC exposes flash
//! through its host command interface: geometry queries, chunked reads
//! and writes, span erases and a one-latch protection scheme.
//!
//! # Protocol overview
//!
//! Requests and responses are framed per protocol generation (see
//! [`proto::EcProtocolVersion`]): a bare command byte, an argument
//! header with an additive checksum, or packet headers with a zero-sum
//! checksum. [`proto::detect`] probes a transport newest-first with a
//! hello command.
//!
//! # Copy coordination
//!
//! The EC runs from the same flash it serves, and it refuses writes to
//! the copy it is executing. Reprogramming therefore runs in passes:
//! park in the read-only copy, write everything it allows, jump to a
//! freshly written copy, then replay the denied spans. [`EcDevice`]
//! implements that dance; [`EcFlashDevice`] exposes it through the
//! unified flash interface so the ordinary erase-and-write algorithm
//! drives it unmodified.
//!
//! # Example
//!
//! ```ignore
//! use fwprog_ec::{EcConfig, EcFlashDevice, MockEc};
//! use fwprog_ec::proto::EcProtocolVersion;
//!
//! let transport = MockEc::new(EcProtocolVersion::V3Packet);
//! let mut device = EcFlashDevice::open(transport, EcConfig::default())?;
//! device.prepare(&image)?;
//! // erase_and_write(&mut device, 0, &image)
//! device.finish()?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod client;
pub mod commands;
pub mod device;
pub mod error;
pub mod mock;
pub mod proto;
pub mod session;
pub mod transport;

pub use client::EcClient;
pub use commands::{EcImage, EcStatus, ProtectFlags};
pub use device::{EcDevice, EcFlashDevice};
pub use error::{EcError, Result};
pub use mock::MockEc;
pub use proto::EcProtocolVersion;
pub use session::{EcConfig, EcSession, FirmwareCopy};
pub use transport::EcTransport;

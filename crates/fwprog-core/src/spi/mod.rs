//! SPI transfer primitives
//!
//! [`SpiOp`] describes one transaction on the wire, [`AddrWidth`] the
//! address phase it carries, and [`opcodes`] the JEDEC command values
//! used to build them.

mod address;
mod command;
pub mod opcodes;

pub use address::AddrWidth;
pub use command::SpiOp;
pub use opcodes::*;

//! Opening flash parts and holding on to them
//!
//! The seam between command code and everything below it. A programmer
//! specification string goes in, a [`FlashHandle`] comes out, and the
//! handle is the only surface the commands touch. Whether the part sits
//! on a raw SPI bus or behind an EC stays on this side of the line.
//!
//! ```ignore
//! use fwprog_flash::open_flash;
//!
//! let mut handle = open_flash("dummy")?;
//! let mut buffer = vec![0u8; handle.size() as usize];
//! handle.read(0, &mut buffer)?;
//! ```

mod handle;
mod registry;

pub use handle::{ChipInfo, FlashHandle};
pub use registry::{
    available_programmers, open_flash, parse_programmer_params, programmer_names_short,
    ProgrammerInfo, ProgrammerParams,
};

// Core types the command layer works with directly.
pub use fwprog_core::flash::FlashDevice;
pub use fwprog_core::layout::Layout;
pub use fwprog_core::wp::{WpConfig, WpMode, WpRange, WriteOptions};

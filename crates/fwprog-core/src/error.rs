//! Crate-wide error type
//!
//! One flat `Copy` enum covers the whole stack so errors cross the
//! `no_std` boundary without allocation. Variants carry data only where
//! a caller can act on it.

use core::fmt;

/// Why an erase did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseFailure {
    /// The erase command itself failed or timed out
    CommandFailed {
        /// Block address the command targeted
        addr: u32,
    },
    /// The block read back with unerased bytes
    VerifyFailed {
        /// Address of the first byte that was not 0xFF
        addr: u32,
        /// Value found there
        found: u8,
    },
    /// The transport reported failure without detail
    Unknown,
}

/// Everything that can go wrong talking to a flash part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A SPI transfer did not complete
    SpiTransferFailed,
    /// A SPI transfer ran past its deadline
    SpiTimeout,
    /// The programmer refuses to pass this opcode through
    OpcodeNotSupported,
    /// No chip answered the JEDEC probe, or the ID is unknown
    ChipNotFound,
    /// The chip answered but this stack cannot drive it
    UnsupportedChip,
    /// The chip's JEDEC ID is not the one the caller demanded
    JedecIdMismatch,
    /// An erase failed; see the payload for where and how
    EraseError(EraseFailure),
    /// A program operation failed
    WriteError,
    /// Readback after a write did not match the written data
    VerifyError,
    /// A polled operation never finished
    Timeout,
    /// The chip or transport has no way to do this
    UnsupportedOperation,
    /// The hardware reported a failed transaction
    HardwareTransactionFailed,
    /// The access runs past the end of the part
    AddressOutOfBounds,
    /// Address or length off the required boundary
    InvalidAlignment,
    /// The supplied buffer cannot hold the result
    BufferTooSmall,
    /// The chip offers no protection range matching the request
    UnsupportedRange,
    /// Protection bits read back different from what was written
    ProtectionWriteFailed {
        /// Masked value the write should have produced
        expected: u8,
        /// Masked value actually read back
        actual: u8,
    },
    /// The target region is protected or in active use
    AccessDenied,
    /// No intact firmware copy remains to run from
    NoValidCopy,
    /// The programmer is not initialized or is busy
    ProgrammerNotReady,
    /// The programmer failed in an unspecified way
    ProgrammerError,
    /// A read operation failed
    ReadError,
    /// Host-side I/O failed
    IoError,
    /// The layout does not fit the chip
    LayoutError,
}

impl fmt::Display for EraseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed { addr } => {
                write!(f, "erase command failed at 0x{addr:08X}")
            }
            Self::VerifyFailed { addr, found } => {
                write!(f, "0x{addr:08X} holds 0x{found:02X} after erase")
            }
            Self::Unknown => f.write_str("erase failed"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::SpiTransferFailed => "SPI transfer failed",
            Self::SpiTimeout => "SPI transfer timed out",
            Self::OpcodeNotSupported => "opcode not supported by the programmer",
            Self::ChipNotFound => "no supported flash chip found",
            Self::UnsupportedChip => "flash chip is not supported",
            Self::JedecIdMismatch => "JEDEC ID does not match the requested chip",
            Self::EraseError(failure) => return failure.fmt(f),
            Self::WriteError => "write failed",
            Self::VerifyError => "verify found mismatching data",
            Self::Timeout => "operation timed out",
            Self::UnsupportedOperation => "operation not supported",
            Self::HardwareTransactionFailed => "hardware transaction failed",
            Self::AddressOutOfBounds => "address out of bounds",
            Self::InvalidAlignment => "address or length is misaligned",
            Self::BufferTooSmall => "buffer too small",
            Self::UnsupportedRange => "chip cannot protect that range",
            Self::ProtectionWriteFailed { expected, actual } => {
                return write!(
                    f,
                    "protection bits read back 0x{actual:02X}, wanted 0x{expected:02X}"
                );
            }
            Self::AccessDenied => "region is protected or in use",
            Self::NoValidCopy => "no valid firmware copy to run from",
            Self::ProgrammerNotReady => "programmer not ready",
            Self::ProgrammerError => "programmer error",
            Self::ReadError => "read failed",
            Self::IoError => "I/O error",
            Self::LayoutError => "layout does not fit the chip",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Convenience alias used throughout the crate
pub type Result<T> = core::result::Result<T, Error>;

//! Error types for EC operations

use core::fmt;

use fwprog_core::error::Error as CoreError;

use crate::commands::EcStatus;

/// EC-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcError {
    /// No EC answered the protocol probe on this transport
    NotDetected,
    /// The EC returned a non-success status code
    Status(EcStatus),
    /// The response was framed for a different protocol generation
    ProtocolMismatch,
    /// Frame checksum did not verify
    InvalidChecksum,
    /// Response frame was truncated or its fields are inconsistent
    MalformedResponse,
    /// The EC returned more data than the caller asked for
    ResponseTooLong,
    /// Request payload exceeds what the protocol generation can carry
    FrameTooLong,
    /// No fresh firmware copy remains to jump to
    NoValidCopy,
    /// The EC reports it is running an unknown image
    UnknownImage,
    /// The EC did not answer in time
    Timeout,
}

impl fmt::Display for EcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDetected => write!(f, "no EC detected on transport"),
            Self::Status(status) => write!(f, "EC returned error: {}", status),
            Self::ProtocolMismatch => write!(f, "EC protocol mismatch"),
            Self::InvalidChecksum => write!(f, "EC response has invalid checksum"),
            Self::MalformedResponse => write!(f, "malformed EC response"),
            Self::ResponseTooLong => write!(f, "EC returned too much data"),
            Self::FrameTooLong => write!(f, "request too large for EC protocol"),
            Self::NoValidCopy => write!(f, "no valid firmware copy available"),
            Self::UnknownImage => write!(f, "EC is running an unknown firmware copy"),
            Self::Timeout => write!(f, "EC communication timeout"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EcError {}

impl From<EcError> for CoreError {
    fn from(e: EcError) -> Self {
        match e {
            EcError::Status(EcStatus::AccessDenied) => CoreError::AccessDenied,
            EcError::Status(EcStatus::Timeout) | EcError::Timeout => CoreError::Timeout,
            EcError::NoValidCopy => CoreError::NoValidCopy,
            EcError::NotDetected => CoreError::ProgrammerNotReady,
            EcError::ProtocolMismatch
            | EcError::InvalidChecksum
            | EcError::MalformedResponse
            | EcError::ResponseTooLong => CoreError::HardwareTransactionFailed,
            _ => CoreError::ProgrammerError,
        }
    }
}

/// Result type for EC operations
pub type Result<T> = core::result::Result<T, EcError>;

//! Error types for memoree-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Every variant maps onto a legacy numeric error code
//! through [`Error::code`].

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// Bus transaction failed
    Fail,
    /// A buffer could not be allocated or does not fit a fixed-size frame
    OutOfMemory,
    /// Bad variant, buffer, address, page or configuration
    InvalidArgument,
    /// Operation timed out
    Timeout,
    /// The flash did not answer with the "SFDP" signature
    SfdpNotSupported,
    /// A reserved field or length in the SFDP header or parameter table is wrong
    SfdpInvalidHeader,
}

impl Error {
    /// Numeric error code (always negative, `0` being success)
    pub const fn code(&self) -> i32 {
        match self {
            Self::Fail => -1,
            Self::OutOfMemory => -2,
            Self::InvalidArgument => -3,
            Self::Timeout => -4,
            Self::SfdpNotSupported => -5,
            Self::SfdpInvalidHeader => -6,
        }
    }

    /// Inverse of [`Error::code`]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Fail),
            -2 => Some(Self::OutOfMemory),
            -3 => Some(Self::InvalidArgument),
            -4 => Some(Self::Timeout),
            -5 => Some(Self::SfdpNotSupported),
            -6 => Some(Self::SfdpInvalidHeader),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "bus transaction failed"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::SfdpNotSupported => write!(f, "flash does not support SFDP"),
            Self::SfdpInvalidHeader => write!(f, "SFDP header or parameter table is corrupted"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A multi-chunk write that stopped early
///
/// `written` counts the bytes committed by the chunks that completed before
/// `error` was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialWrite {
    /// Bytes successfully written before the failure
    pub written: usize,
    /// The failure that stopped the write
    pub error: Error,
}

impl PartialWrite {
    /// Create a partial write report
    pub const fn new(written: usize, error: Error) -> Self {
        Self { written, error }
    }
}

impl From<Error> for PartialWrite {
    fn from(error: Error) -> Self {
        Self::new(0, error)
    }
}

impl fmt::Display for PartialWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} bytes", self.error, self.written)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PartialWrite {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_codes() {
        assert_eq!(Error::Fail.code(), -1);
        assert_eq!(Error::InvalidArgument.code(), -3);
        assert_eq!(Error::SfdpInvalidHeader.code(), -6);
        assert_eq!(Error::from_code(-5), Some(Error::SfdpNotSupported));
        assert_eq!(Error::from_code(0), None);
    }
}

//! Error types for rmtd-core
//!
//! One variant per failure kind the library can report. The error is `Copy`
//! and `no_std` compatible; backend error codes are carried as raw `errno`
//! values.

use core::fmt;

/// `EIO`, reported when the backend transfers fewer bytes than requested
pub const EIO: i32 = 5;

/// Eraseblock-level operation that reached the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Eraseblock erase
    Erase,
    /// Bad-block query
    IsBad,
    /// Bad-block marking
    MarkBad,
    /// Data read
    Read,
    /// Data write
    Write,
}

impl Operation {
    /// Short lowercase name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            Self::Erase => "erase",
            Self::IsBad => "bad-block query",
            Self::MarkBad => "mark bad",
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Core error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The MTD subsystem is not present on this machine
    SubsystemAbsent,
    /// The requested device or node does not exist or does not resolve
    NoSuchDevice,
    /// The path exists but is not an MTD device node
    NotADevice,
    /// Eraseblock index, offset or length out of range, or the geometry
    /// descriptor is internally inconsistent
    InvalidArgument,
    /// Mutating operation on a read-only device
    ReadOnlyDevice,
    /// Operation not applicable to this device class
    Unsupported,
    /// The backend failed an eraseblock operation
    IoFailure {
        /// Operation that failed
        op: Operation,
        /// Eraseblock the operation targeted
        eb: u32,
        /// Raw backend error code
        code: i32,
    },
    /// Any other OS-level failure during session or metadata access
    SystemError(i32),
}

impl Error {
    /// The raw OS/backend error code, if this failure carries one
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::IoFailure { code, .. } | Self::SystemError(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubsystemAbsent => write!(f, "MTD subsystem is not present"),
            Self::NoSuchDevice => write!(f, "no such MTD device"),
            Self::NotADevice => write!(f, "not an MTD device node"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::ReadOnlyDevice => write!(f, "MTD device is read-only"),
            Self::Unsupported => write!(f, "operation not supported by this MTD device"),
            Self::IoFailure { op, eb, code } => {
                write!(f, "{} failed at eraseblock {} (error {})", op, eb, code)
            }
            Self::SystemError(code) => write!(f, "system error {}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

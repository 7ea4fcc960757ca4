//! Error types for Linux MTD operations

use rmtd_core::BackendError;
use std::io;
use thiserror::Error;

/// Linux MTD-specific errors
#[derive(Debug, Error)]
pub enum LinuxMtdError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to read sysfs attribute
    #[error("Failed to read sysfs attribute '{path}': {source}")]
    SysfsRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse sysfs attribute
    #[error("Failed to parse sysfs attribute '{path}': {value}")]
    SysfsParse { path: String, value: String },

    /// Failed to read the /proc/mtd device list
    #[error("Failed to read MTD device list '{path}': {source}")]
    ProcRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Malformed line in /proc/mtd
    #[error("Malformed /proc/mtd line {line}: '{content}'")]
    ProcParse { line: usize, content: String },

    /// Failed to open a device node
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Control call failed
    #[error("{name} ioctl failed: {source}")]
    Ioctl {
        name: &'static str,
        #[source]
        source: nix::errno::Errno,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Result type for Linux MTD operations
pub type Result<T> = std::result::Result<T, LinuxMtdError>;

/// Map an I/O error onto the backend error space
pub(crate) fn io_to_backend(e: &io::Error) -> BackendError {
    if e.kind() == io::ErrorKind::NotFound {
        BackendError::NotFound
    } else {
        BackendError::Os(e.raw_os_error().unwrap_or(libc::EIO))
    }
}

impl From<LinuxMtdError> for BackendError {
    fn from(e: LinuxMtdError) -> Self {
        match e {
            LinuxMtdError::Io(source)
            | LinuxMtdError::SysfsRead { source, .. }
            | LinuxMtdError::ProcRead { source, .. }
            | LinuxMtdError::OpenFailed { source, .. } => io_to_backend(&source),
            LinuxMtdError::Ioctl { source, .. } => BackendError::Os(source as i32),
            LinuxMtdError::SysfsParse { .. }
            | LinuxMtdError::ProcParse { .. }
            | LinuxMtdError::InvalidParameter { .. } => BackendError::Os(libc::EINVAL),
        }
    }
}

//! Device registry: library session and subsystem summary

use crate::backend::{BackendError, Interface, MetadataBackend};
use crate::error::{Error, Result};
use alloc::vec::Vec;

/// Aggregate information about the MTD subsystem
///
/// Computed fresh on every [`Session::get_info`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemSummary {
    /// Count of MTD devices present
    pub dev_count: u32,
    /// Lowest device number present (`None` when there are no devices)
    pub lowest_dev_num: Option<u32>,
    /// Highest device number present (`None` when there are no devices)
    pub highest_dev_num: Option<u32>,
    /// Whether the subsystem exposes per-device sysfs attributes
    pub sysfs_supported: bool,
}

/// An open connection to the MTD subsystem
///
/// Created by [`Session::open`], released by [`Session::close`] or by going
/// out of scope. The session owns its metadata backend; geometry records it
/// hands out are independent copies owned by the caller.
///
/// All queries take `&self` and recompute their answer from the backend, so
/// a session can be shared between threads whenever the backend is `Sync`.
pub struct Session<B: MetadataBackend> {
    pub(crate) backend: B,
    interface: Interface,
}

impl<B: MetadataBackend> Session<B> {
    /// Open the MTD subsystem through `backend`
    ///
    /// # Errors
    /// - [`Error::SubsystemAbsent`] if the subsystem is not present at all
    /// - [`Error::SystemError`] for any other initialization fault
    ///
    /// A session opens successfully even if no devices are present.
    pub fn open(backend: B) -> Result<Self> {
        match backend.probe() {
            Ok(Some(interface)) => Ok(Self { backend, interface }),
            Ok(None) | Err(BackendError::NotFound) | Err(BackendError::NotCharDevice) => {
                Err(Error::SubsystemAbsent)
            }
            Err(BackendError::Os(code)) => Err(Error::SystemError(code)),
        }
    }

    /// Close the session, releasing the backend
    pub fn close(self) {}

    /// Metadata interface detected when the session was opened
    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Borrow the metadata backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrow the metadata backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Get general MTD subsystem information
    ///
    /// # Errors
    /// - [`Error::SubsystemAbsent`] if the subsystem disappeared since open
    /// - [`Error::SystemError`] if the device list cannot be read
    pub fn get_info(&self) -> Result<SubsystemSummary> {
        let interface = match self.backend.probe() {
            Ok(Some(interface)) => interface,
            Ok(None) | Err(BackendError::NotFound) | Err(BackendError::NotCharDevice) => {
                return Err(Error::SubsystemAbsent)
            }
            Err(BackendError::Os(code)) => return Err(Error::SystemError(code)),
        };

        let devices = self.device_numbers()?;

        Ok(SubsystemSummary {
            dev_count: devices.len() as u32,
            lowest_dev_num: devices.first().copied(),
            highest_dev_num: devices.last().copied(),
            sysfs_supported: interface == Interface::Sysfs,
        })
    }

    /// Sorted list of the device numbers currently present
    pub fn device_numbers(&self) -> Result<Vec<u32>> {
        let mut devices = self.backend.device_numbers().map_err(|e| match e {
            BackendError::Os(code) => Error::SystemError(code),
            BackendError::NotFound | BackendError::NotCharDevice => Error::SubsystemAbsent,
        })?;
        devices.sort_unstable();
        devices.dedup();
        Ok(devices)
    }
}

impl<B: MetadataBackend> core::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}

//! Node prober
//!
//! Maps a device node to an MTD device number by comparing the node's
//! major/minor against each present device. Only the cheap per-device node
//! id is read; full geometry is left to the resolver.

use crate::backend::{BackendError, MetadataBackend};
use crate::error::{Error, Result};
use crate::registry::Session;

/// Outcome of looking a node up among the present devices
pub(crate) enum NodeLookup {
    /// The node belongs to this device number
    Device(u32),
    /// The path does not exist
    Missing,
    /// The path exists but belongs to no MTD device
    NotMtd,
}

impl<B: MetadataBackend> Session<B> {
    /// Test whether `node` is an MTD device node
    ///
    /// Returns the device number the node belongs to.
    ///
    /// # Errors
    /// - [`Error::NotADevice`] if the path exists but is not an MTD node
    /// - [`Error::NoSuchDevice`] if the path does not exist
    /// - [`Error::SystemError`] if probing failed for another OS reason
    pub fn probe_node(&self, node: &str) -> Result<u32> {
        match self.lookup_node(node)? {
            NodeLookup::Device(dev_num) => Ok(dev_num),
            NodeLookup::Missing => Err(Error::NoSuchDevice),
            NodeLookup::NotMtd => Err(Error::NotADevice),
        }
    }

    pub(crate) fn lookup_node(&self, node: &str) -> Result<NodeLookup> {
        let id = match self.backend.node_id(node) {
            Ok(id) => id,
            Err(BackendError::NotFound) => return Ok(NodeLookup::Missing),
            Err(BackendError::NotCharDevice) => return Ok(NodeLookup::NotMtd),
            Err(BackendError::Os(code)) => return Err(Error::SystemError(code)),
        };

        // With the subsystem gone there is nothing left to match against
        let devices = match self.device_numbers() {
            Ok(devices) => devices,
            Err(Error::SubsystemAbsent) => return Ok(NodeLookup::NotMtd),
            Err(e) => return Err(e),
        };

        for dev_num in devices {
            match self.backend.device_node_id(dev_num) {
                Ok(dev_id) if dev_id == id => return Ok(NodeLookup::Device(dev_num)),
                Ok(_) => {}
                // Device vanished between listing and lookup
                Err(BackendError::NotFound) | Err(BackendError::NotCharDevice) => {}
                Err(BackendError::Os(code)) => return Err(Error::SystemError(code)),
            }
        }

        Ok(NodeLookup::NotMtd)
    }
}

//! Geometry resolver
//!
//! Resolution is a pure read-and-populate step. Inconsistent geometry (for
//! example `eb_cnt * eb_size` disagreeing with `size`) is passed through as
//! reported; the I/O engine rejects it when an operation is attempted.

use crate::backend::{BackendError, MetadataBackend, MtdFlags, RawAttributes};
use crate::error::{Error, Result};
use crate::geometry::{DeviceGeometry, DeviceName, FlashType, TypeString};
use crate::probe::NodeLookup;
use crate::registry::Session;

/// Build a geometry record from raw backend attributes
///
/// Over-long name and type strings are truncated. `eb_cnt` is
/// `size / eb_size`, or zero when the backend reports a zero eraseblock size.
pub fn geometry_from_attributes(dev_num: u32, raw: &RawAttributes) -> DeviceGeometry {
    let flash_type = FlashType::from_type_str(&raw.type_str);
    let eb_cnt = raw
        .size
        .checked_div(u64::from(raw.eb_size))
        .map_or(0, |cnt| u32::try_from(cnt).unwrap_or(u32::MAX));

    DeviceGeometry {
        dev_num,
        major: raw.node.major,
        minor: raw.node.minor,
        flash_type,
        type_str: TypeString::truncated(&raw.type_str),
        name: DeviceName::truncated(&raw.name),
        size: raw.size,
        eb_cnt,
        eb_size: raw.eb_size,
        min_io_size: raw.min_io_size,
        subpage_size: raw.subpage_size,
        oob_size: raw.oob_size,
        region_cnt: raw.region_cnt,
        writable: raw.flags.contains(MtdFlags::WRITEABLE),
        bb_allowed: flash_type.may_have_bad_blocks(),
    }
}

impl<B: MetadataBackend> Session<B> {
    /// Get information about the MTD device behind the node file `node`
    ///
    /// # Errors
    /// - [`Error::NoSuchDevice`] if `node` does not exist, is not an MTD
    ///   character device, or belongs to no live device
    /// - [`Error::SystemError`] on I/O errors while reading metadata
    pub fn device_info(&self, node: &str) -> Result<DeviceGeometry> {
        match self.lookup_node(node)? {
            NodeLookup::Device(dev_num) => self.device_info_by_number(dev_num),
            NodeLookup::Missing | NodeLookup::NotMtd => Err(Error::NoSuchDevice),
        }
    }

    /// Get information about MTD device number `dev_num`
    ///
    /// Identical to [`Session::device_info`] except for the key; both return
    /// the same record for the same device.
    pub fn device_info_by_number(&self, dev_num: u32) -> Result<DeviceGeometry> {
        let raw = self.backend.attributes(dev_num).map_err(|e| match e {
            BackendError::NotFound | BackendError::NotCharDevice => Error::NoSuchDevice,
            BackendError::Os(code) => Error::SystemError(code),
        })?;
        Ok(geometry_from_attributes(dev_num, &raw))
    }
}

//! Eraseblock I/O discipline engine
//!
//! Every operation is scoped to one eraseblock of a resolved
//! [`DeviceGeometry`] and goes straight through to the caller's
//! [`DataBackend`]. Arguments and device capabilities are checked first; a
//! call that fails those checks never reaches the backend.
//!
//! Order of checks:
//!
//! 1. Capability (`bb_allowed` for [`mark_bad`], `writable` for [`erase`],
//!    [`mark_bad`] and [`write`])
//! 2. Geometry consistency and eraseblock index
//! 3. Intra-block offset and length (`offset + len <= eb_size`)
//!
//! Alignment to `min_io_size` is not checked here; the backend rejects what
//! it cannot do, and some backends pad partial units themselves.
//!
//! Backend failures are reported as [`Error::IoFailure`] with the backend's
//! raw code and are never retried. A failed erase is not treated as a bad
//! block either: callers that want to know follow up with [`is_bad`].

use crate::backend::DataBackend;
use crate::error::{Error, Operation, Result, EIO};
use crate::geometry::DeviceGeometry;
use alloc::vec;
use alloc::vec::Vec;

/// Result of a bad-block query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadBlockState {
    /// The eraseblock is usable
    Good,
    /// The eraseblock is marked bad
    Bad,
}

impl BadBlockState {
    /// Whether the eraseblock is bad
    pub fn is_bad(self) -> bool {
        self == Self::Bad
    }
}

fn check_eb(geometry: &DeviceGeometry, eb: u32) -> Result<()> {
    if !geometry.is_consistent() || eb >= geometry.eb_cnt {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

fn check_range(geometry: &DeviceGeometry, offset: u32, len: usize) -> Result<()> {
    let end = u64::from(offset)
        .checked_add(len as u64)
        .ok_or(Error::InvalidArgument)?;
    if end > u64::from(geometry.eb_size) {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

fn check_writable(geometry: &DeviceGeometry) -> Result<()> {
    if !geometry.writable {
        return Err(Error::ReadOnlyDevice);
    }
    Ok(())
}

fn io_failure(op: Operation, eb: u32) -> impl FnOnce(i32) -> Error {
    move |code| Error::IoFailure { op, eb, code }
}

/// Erase eraseblock `eb`
///
/// # Errors
/// - [`Error::ReadOnlyDevice`] if the device is not writable
/// - [`Error::InvalidArgument`] if `eb` is out of range
/// - [`Error::IoFailure`] if the backend fails the erase
pub fn erase<D: DataBackend + ?Sized>(
    geometry: &DeviceGeometry,
    dev: &mut D,
    eb: u32,
) -> Result<()> {
    check_writable(geometry)?;
    check_eb(geometry, eb)?;

    dev.erase(geometry.eb_offset(eb), geometry.eb_size)
        .map_err(io_failure(Operation::Erase, eb))
}

/// Check whether eraseblock `eb` is bad
///
/// Devices that cannot have bad blocks report [`BadBlockState::Good`]
/// without a backend call, unless the backend defines the query for every
/// device class.
///
/// # Errors
/// - [`Error::InvalidArgument`] if `eb` is out of range
/// - [`Error::IoFailure`] if the backend fails the query
pub fn is_bad<D: DataBackend + ?Sized>(
    geometry: &DeviceGeometry,
    dev: &mut D,
    eb: u32,
) -> Result<BadBlockState> {
    check_eb(geometry, eb)?;

    if !geometry.bb_allowed && !dev.universal_bad_block_query() {
        return Ok(BadBlockState::Good);
    }

    match dev.is_bad(geometry.eb_offset(eb)) {
        Ok(true) => Ok(BadBlockState::Bad),
        Ok(false) => Ok(BadBlockState::Good),
        Err(code) => Err(Error::IoFailure {
            op: Operation::IsBad,
            eb,
            code,
        }),
    }
}

/// Mark eraseblock `eb` bad
///
/// # Errors
/// - [`Error::Unsupported`] if the device cannot have bad blocks
/// - [`Error::ReadOnlyDevice`] if the device is not writable
/// - [`Error::InvalidArgument`] if `eb` is out of range
/// - [`Error::IoFailure`] if the backend fails the operation
pub fn mark_bad<D: DataBackend + ?Sized>(
    geometry: &DeviceGeometry,
    dev: &mut D,
    eb: u32,
) -> Result<()> {
    if !geometry.bb_allowed {
        return Err(Error::Unsupported);
    }
    check_writable(geometry)?;
    check_eb(geometry, eb)?;

    dev.mark_bad(geometry.eb_offset(eb))
        .map_err(io_failure(Operation::MarkBad, eb))
}

/// Read `len` bytes from eraseblock `eb` at intra-block `offset`
///
/// # Errors
/// - [`Error::InvalidArgument`] if `eb` is out of range or the range runs
///   past the end of the eraseblock
/// - [`Error::IoFailure`] if the backend fails or returns fewer bytes than
///   requested
pub fn read<D: DataBackend + ?Sized>(
    geometry: &DeviceGeometry,
    dev: &mut D,
    eb: u32,
    offset: u32,
    len: usize,
) -> Result<Vec<u8>> {
    // Validate before allocating
    check_eb(geometry, eb)?;
    check_range(geometry, offset, len)?;

    let mut buf = vec![0u8; len];
    read_into(geometry, dev, eb, offset, &mut buf)?;
    Ok(buf)
}

/// Fill `buf` from eraseblock `eb` at intra-block `offset`
///
/// Same checks and errors as [`read`].
pub fn read_into<D: DataBackend + ?Sized>(
    geometry: &DeviceGeometry,
    dev: &mut D,
    eb: u32,
    offset: u32,
    buf: &mut [u8],
) -> Result<()> {
    check_eb(geometry, eb)?;
    check_range(geometry, offset, buf.len())?;

    let addr = geometry.eb_offset(eb) + u64::from(offset);
    let n = dev
        .read_at(addr, buf)
        .map_err(io_failure(Operation::Read, eb))?;
    if n != buf.len() {
        return Err(Error::IoFailure {
            op: Operation::Read,
            eb,
            code: EIO,
        });
    }
    Ok(())
}

/// Write `data` to eraseblock `eb` at intra-block `offset`
///
/// The target area is expected to be erased; the engine does not check.
///
/// # Errors
/// - [`Error::ReadOnlyDevice`] if the device is not writable
/// - [`Error::InvalidArgument`] if `eb` is out of range or the data runs
///   past the end of the eraseblock
/// - [`Error::IoFailure`] if the backend fails or writes fewer bytes than
///   requested
pub fn write<D: DataBackend + ?Sized>(
    geometry: &DeviceGeometry,
    dev: &mut D,
    eb: u32,
    offset: u32,
    data: &[u8],
) -> Result<()> {
    check_writable(geometry)?;
    check_eb(geometry, eb)?;
    check_range(geometry, offset, data.len())?;

    let addr = geometry.eb_offset(eb) + u64::from(offset);
    let n = dev
        .write_at(addr, data)
        .map_err(io_failure(Operation::Write, eb))?;
    if n != data.len() {
        return Err(Error::IoFailure {
            op: Operation::Write,
            eb,
            code: EIO,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DeviceName, FlashType, TypeString};
    use crate::testing::{Call, RecordingData};

    fn geometry(eb_cnt: u32, eb_size: u32) -> DeviceGeometry {
        DeviceGeometry {
            dev_num: 0,
            major: 90,
            minor: 0,
            flash_type: FlashType::Nand,
            type_str: TypeString::truncated("nand"),
            name: DeviceName::truncated("test"),
            size: u64::from(eb_cnt) * u64::from(eb_size),
            eb_cnt,
            eb_size,
            min_io_size: 1,
            subpage_size: 1,
            oob_size: 0,
            region_cnt: 0,
            writable: true,
            bb_allowed: true,
        }
    }

    #[test]
    fn test_erase_bounds() {
        let geo = geometry(100, 4096);
        let mut dev = RecordingData::default();

        erase(&geo, &mut dev, 99).unwrap();
        assert_eq!(dev.calls, [Call::Erase(99 * 4096, 4096)]);

        assert_eq!(erase(&geo, &mut dev, 100), Err(Error::InvalidArgument));
        assert_eq!(dev.calls.len(), 1);
    }

    #[test]
    fn test_read_bounds() {
        let geo = geometry(100, 4096);
        let mut dev = RecordingData::default();

        assert_eq!(
            read(&geo, &mut dev, 99, 4090, 10),
            Err(Error::InvalidArgument)
        );
        assert!(dev.calls.is_empty());

        let data = read(&geo, &mut dev, 99, 4086, 10).unwrap();
        assert_eq!(data, [0xA5; 10]);
        assert_eq!(dev.calls, [Call::Read(99 * 4096 + 4086, 10)]);
    }

    #[test]
    fn test_out_of_range_eraseblock_never_reaches_backend() {
        let geo = geometry(16, 2048);
        let mut dev = RecordingData::default();
        let mut buf = [0u8; 4];

        for eb in [16, 17, 1000, u32::MAX] {
            assert_eq!(erase(&geo, &mut dev, eb), Err(Error::InvalidArgument));
            assert_eq!(is_bad(&geo, &mut dev, eb), Err(Error::InvalidArgument));
            assert_eq!(mark_bad(&geo, &mut dev, eb), Err(Error::InvalidArgument));
            assert_eq!(read(&geo, &mut dev, eb, 0, 4), Err(Error::InvalidArgument));
            assert_eq!(
                read_into(&geo, &mut dev, eb, 0, &mut buf),
                Err(Error::InvalidArgument)
            );
            assert_eq!(write(&geo, &mut dev, eb, 0, &buf), Err(Error::InvalidArgument));
        }
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn test_offset_overflow_is_rejected() {
        let geo = geometry(4, 4096);
        let mut dev = RecordingData::default();
        assert_eq!(
            read(&geo, &mut dev, 0, u32::MAX, 2),
            Err(Error::InvalidArgument)
        );
        assert_eq!(write(&geo, &mut dev, 0, 4096, &[0]), Err(Error::InvalidArgument));
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn test_read_only_device() {
        let mut geo = geometry(8, 4096);
        geo.writable = false;
        let mut dev = RecordingData::default();

        assert_eq!(write(&geo, &mut dev, 0, 0, &[0u8; 16]), Err(Error::ReadOnlyDevice));
        assert_eq!(write(&geo, &mut dev, 100, 0, &[0u8; 16]), Err(Error::ReadOnlyDevice));
        assert_eq!(erase(&geo, &mut dev, 0), Err(Error::ReadOnlyDevice));
        assert_eq!(mark_bad(&geo, &mut dev, 0), Err(Error::ReadOnlyDevice));
        assert!(dev.calls.is_empty());

        // Reads still go through
        read(&geo, &mut dev, 0, 0, 16).unwrap();
        assert_eq!(dev.calls.len(), 1);
    }

    #[test]
    fn test_mark_bad_unsupported() {
        let mut geo = geometry(8, 4096);
        geo.flash_type = FlashType::Nor;
        geo.bb_allowed = false;
        let mut dev = RecordingData::default();

        assert_eq!(mark_bad(&geo, &mut dev, 0), Err(Error::Unsupported));
        assert_eq!(mark_bad(&geo, &mut dev, 8), Err(Error::Unsupported));
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn test_is_bad_without_bad_block_concept() {
        let mut geo = geometry(8, 4096);
        geo.bb_allowed = false;

        let mut dev = RecordingData {
            bad: true,
            fail_with: Some(95),
            ..Default::default()
        };
        assert_eq!(is_bad(&geo, &mut dev, 3), Ok(BadBlockState::Good));
        assert!(dev.calls.is_empty());

        // A backend that answers for every device class is asked
        let mut dev = RecordingData {
            bad: true,
            universal: true,
            ..Default::default()
        };
        assert_eq!(is_bad(&geo, &mut dev, 3), Ok(BadBlockState::Bad));
        assert_eq!(dev.calls, [Call::IsBad(3 * 4096)]);
    }

    #[test]
    fn test_is_bad_tri_state() {
        let geo = geometry(8, 4096);

        let mut dev = RecordingData::default();
        assert_eq!(is_bad(&geo, &mut dev, 1), Ok(BadBlockState::Good));

        dev.bad = true;
        assert_eq!(is_bad(&geo, &mut dev, 1), Ok(BadBlockState::Bad));
        assert!(BadBlockState::Bad.is_bad());

        dev.fail_with = Some(5);
        assert_eq!(
            is_bad(&geo, &mut dev, 1),
            Err(Error::IoFailure {
                op: Operation::IsBad,
                eb: 1,
                code: 5
            })
        );
    }

    #[test]
    fn test_erase_failure_is_not_reclassified() {
        let geo = geometry(16, 4096);
        let mut dev = RecordingData {
            fail_with: Some(5),
            ..Default::default()
        };

        assert_eq!(
            erase(&geo, &mut dev, 7),
            Err(Error::IoFailure {
                op: Operation::Erase,
                eb: 7,
                code: 5
            })
        );
        // One attempt, no retry, no implicit bad-block query
        assert_eq!(dev.calls, [Call::Erase(7 * 4096, 4096)]);
    }

    #[test]
    fn test_short_transfers_fail() {
        let geo = geometry(4, 4096);
        let mut dev = RecordingData {
            short: true,
            ..Default::default()
        };

        assert_eq!(
            read(&geo, &mut dev, 1, 0, 512),
            Err(Error::IoFailure {
                op: Operation::Read,
                eb: 1,
                code: EIO
            })
        );
        assert_eq!(
            write(&geo, &mut dev, 2, 0, &[0u8; 512]),
            Err(Error::IoFailure {
                op: Operation::Write,
                eb: 2,
                code: EIO
            })
        );
    }

    #[test]
    fn test_inconsistent_geometry_is_rejected() {
        let mut dev = RecordingData::default();

        let zero = geometry(0, 0);
        assert_eq!(erase(&zero, &mut dev, 0), Err(Error::InvalidArgument));

        let mut oversized = geometry(100, 4096);
        oversized.size = 50 * 4096;
        assert_eq!(erase(&oversized, &mut dev, 10), Err(Error::InvalidArgument));
        assert_eq!(read(&oversized, &mut dev, 10, 0, 1), Err(Error::InvalidArgument));
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn test_write_passes_unaligned_requests_through() {
        let mut geo = geometry(4, 4096);
        geo.min_io_size = 512;
        let mut dev = RecordingData::default();

        write(&geo, &mut dev, 0, 3, &[1, 2, 3]).unwrap();
        assert_eq!(dev.calls, [Call::Write(3, 3)]);
    }
}

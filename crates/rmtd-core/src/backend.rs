//! Backend trait definitions
//!
//! The library never talks to the OS directly. Device metadata comes from a
//! [`MetadataBackend`] (sysfs attribute files, `/proc/mtd` plus ioctls, or an
//! emulator) and eraseblock I/O goes through a [`DataBackend`], which stands
//! for one open device node owned by the caller.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use bitflags::bitflags;

bitflags! {
    /// MTD device flags, as reported in sysfs `flags` and `MEMGETINFO`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MtdFlags: u32 {
        /// Device is writable
        const WRITEABLE     = 0x400;
        /// Single bits can be flipped
        const BIT_WRITEABLE = 0x800;
        /// Device does not need erase before write
        const NO_ERASE      = 0x1000;
        /// Device is locked after power-up
        const POWERUP_LOCK  = 0x2000;
    }
}

impl Default for MtdFlags {
    fn default() -> Self {
        MtdFlags::empty()
    }
}

/// Which metadata interface the subsystem exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// Per-device attribute files (`/sys/class/mtd`)
    Sysfs,
    /// Device list only, geometry via control calls (`/proc/mtd`)
    Legacy,
}

/// Major/minor pair of a character device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeId {
    /// Major number
    pub major: u32,
    /// Minor number
    pub minor: u32,
}

impl NodeId {
    /// Create a node id
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

/// Errors reported by metadata backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// The object asked about does not exist
    NotFound,
    /// The path exists but is not a character device
    NotCharDevice,
    /// Any other OS-level failure, as a raw `errno`
    Os(i32),
}

/// Result type for metadata backend calls
pub type BackendResult<T> = core::result::Result<T, BackendError>;

/// Geometry attributes of one device, exactly as the backend reports them
///
/// Strings are not length-limited here; the resolver truncates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttributes {
    /// Major/minor of the character node
    pub node: NodeId,
    /// Flash type string (`nand`, `nor`, ...)
    pub type_str: String,
    /// Device name
    pub name: String,
    /// Device size in bytes
    pub size: u64,
    /// Eraseblock size in bytes
    pub eb_size: u32,
    /// Minimum I/O unit size
    pub min_io_size: u32,
    /// Sub-page size
    pub subpage_size: u32,
    /// OOB size per page
    pub oob_size: u32,
    /// Count of additional erase regions
    pub region_cnt: u32,
    /// Device flags
    pub flags: MtdFlags,
}

/// Read-only source of MTD metadata, keyed by device number
pub trait MetadataBackend {
    /// Check whether the subsystem is present
    ///
    /// Returns `Ok(None)` if it is not present at all, and the interface it
    /// exposes otherwise.
    fn probe(&self) -> BackendResult<Option<Interface>>;

    /// List the device numbers currently present, in any order
    ///
    /// Returns `NotFound` if the subsystem itself has disappeared.
    fn device_numbers(&self) -> BackendResult<Vec<u32>>;

    /// Major/minor of the character device at `node`
    fn node_id(&self, node: &str) -> BackendResult<NodeId>;

    /// Major/minor of the character device belonging to `dev_num`
    ///
    /// This must be cheap compared to [`MetadataBackend::attributes`]; the
    /// node prober calls it for every present device.
    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId>;

    /// Read all geometry attributes of `dev_num`
    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes>;
}

impl<T: MetadataBackend + ?Sized> MetadataBackend for &T {
    fn probe(&self) -> BackendResult<Option<Interface>> {
        (**self).probe()
    }

    fn device_numbers(&self) -> BackendResult<Vec<u32>> {
        (**self).device_numbers()
    }

    fn node_id(&self, node: &str) -> BackendResult<NodeId> {
        (**self).node_id(node)
    }

    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId> {
        (**self).device_node_id(dev_num)
    }

    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        (**self).attributes(dev_num)
    }
}

impl<T: MetadataBackend + ?Sized> MetadataBackend for Box<T> {
    fn probe(&self) -> BackendResult<Option<Interface>> {
        (**self).probe()
    }

    fn device_numbers(&self) -> BackendResult<Vec<u32>> {
        (**self).device_numbers()
    }

    fn node_id(&self, node: &str) -> BackendResult<NodeId> {
        (**self).node_id(node)
    }

    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId> {
        (**self).device_node_id(dev_num)
    }

    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        (**self).attributes(dev_num)
    }
}

/// One open MTD device node
///
/// Offsets are absolute byte offsets into the device. Errors are raw
/// `errno` values. Implementations do the call they are asked to do and
/// nothing more: no retries, no bounds checks beyond what the device itself
/// enforces. A handle is single-writer; callers sharing one across threads
/// must serialize access themselves.
pub trait DataBackend {
    /// Erase `len` bytes starting at `offset`
    fn erase(&mut self, offset: u64, len: u32) -> core::result::Result<(), i32>;

    /// Query whether the eraseblock at `offset` is marked bad
    fn is_bad(&mut self, offset: u64) -> core::result::Result<bool, i32>;

    /// Mark the eraseblock at `offset` bad
    fn mark_bad(&mut self, offset: u64) -> core::result::Result<(), i32>;

    /// Read into `buf` from `offset`, returning how many bytes were read
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> core::result::Result<usize, i32>;

    /// Write `data` at `offset`, returning how many bytes were written
    fn write_at(&mut self, offset: u64, data: &[u8]) -> core::result::Result<usize, i32>;

    /// Whether the bad-block query is defined for every device class
    ///
    /// When false, the engine reports devices that cannot have bad blocks as
    /// good without asking the backend.
    fn universal_bad_block_query(&self) -> bool {
        false
    }
}

impl<T: DataBackend + ?Sized> DataBackend for &mut T {
    fn erase(&mut self, offset: u64, len: u32) -> core::result::Result<(), i32> {
        (**self).erase(offset, len)
    }

    fn is_bad(&mut self, offset: u64) -> core::result::Result<bool, i32> {
        (**self).is_bad(offset)
    }

    fn mark_bad(&mut self, offset: u64) -> core::result::Result<(), i32> {
        (**self).mark_bad(offset)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> core::result::Result<usize, i32> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> core::result::Result<usize, i32> {
        (**self).write_at(offset, data)
    }

    fn universal_bad_block_query(&self) -> bool {
        (**self).universal_bad_block_query()
    }
}

impl<T: DataBackend + ?Sized> DataBackend for Box<T> {
    fn erase(&mut self, offset: u64, len: u32) -> core::result::Result<(), i32> {
        (**self).erase(offset, len)
    }

    fn is_bad(&mut self, offset: u64) -> core::result::Result<bool, i32> {
        (**self).is_bad(offset)
    }

    fn mark_bad(&mut self, offset: u64) -> core::result::Result<(), i32> {
        (**self).mark_bad(offset)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> core::result::Result<usize, i32> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> core::result::Result<usize, i32> {
        (**self).write_at(offset, data)
    }

    fn universal_bad_block_query(&self) -> bool {
        (**self).universal_bad_block_query()
    }
}

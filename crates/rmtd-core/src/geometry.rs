//! Device geometry descriptor and related types

use core::fmt;
use core::ops::Deref;

/// Maximum MTD device name length
pub const MTD_NAME_MAX: usize = 127;

/// Maximum MTD device type string length
pub const MTD_TYPE_MAX: usize = 64;

/// Owned text buffer holding at most `N` bytes
///
/// Assigning a longer string truncates it instead of failing. Truncation
/// happens on a character boundary, so for ASCII input the result is exactly
/// `N` bytes long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BoundedString<const N: usize>(heapless::String<N>);

impl<const N: usize> BoundedString<N> {
    /// Maximum length in bytes
    pub const CAPACITY: usize = N;

    /// Copy `s`, dropping whatever does not fit
    pub fn truncated(s: &str) -> Self {
        let mut out = heapless::String::new();
        for c in s.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        Self(out)
    }

    /// Borrow the contents
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<const N: usize> Deref for BoundedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> From<&str> for BoundedString<N> {
    fn from(s: &str) -> Self {
        Self::truncated(s)
    }
}

impl<const N: usize> PartialEq<str> for BoundedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MTD device name
pub type DeviceName = BoundedString<MTD_NAME_MAX>;

/// MTD flash type string
pub type TypeString = BoundedString<MTD_TYPE_MAX>;

/// Flash type, with codes matching the kernel's `mtd-abi.h`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashType {
    /// No device present
    Absent,
    /// RAM-backed device
    Ram,
    /// ROM device
    Rom,
    /// NOR flash
    Nor,
    /// SLC NAND flash
    Nand,
    /// Atmel DataFlash
    DataFlash,
    /// UBI volume emulated as MTD device
    UbiVolume,
    /// MLC NAND flash
    MlcNand,
    /// Type string not recognized
    Unknown,
}

impl FlashType {
    /// Numeric type code (`-1` for unrecognized types)
    pub fn code(self) -> i32 {
        match self {
            Self::Absent => 0,
            Self::Ram => 1,
            Self::Rom => 2,
            Self::Nor => 3,
            Self::Nand => 4,
            Self::DataFlash => 6,
            Self::UbiVolume => 7,
            Self::MlcNand => 8,
            Self::Unknown => -1,
        }
    }

    /// Look up a type by numeric code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Absent,
            1 => Self::Ram,
            2 => Self::Rom,
            3 => Self::Nor,
            4 => Self::Nand,
            6 => Self::DataFlash,
            7 => Self::UbiVolume,
            8 => Self::MlcNand,
            _ => Self::Unknown,
        }
    }

    /// Look up a type by the string sysfs reports in `type`
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "absent" => Self::Absent,
            "ram" => Self::Ram,
            "rom" => Self::Rom,
            "nor" => Self::Nor,
            "nand" => Self::Nand,
            "dataflash" => Self::DataFlash,
            "ubi" => Self::UbiVolume,
            "mlc-nand" => Self::MlcNand,
            _ => Self::Unknown,
        }
    }

    /// The sysfs type string for this type
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Ram => "ram",
            Self::Rom => "rom",
            Self::Nor => "nor",
            Self::Nand => "nand",
            Self::DataFlash => "dataflash",
            Self::UbiVolume => "ubi",
            Self::MlcNand => "mlc-nand",
            Self::Unknown => "unknown",
        }
    }

    /// Whether devices of this type may have bad eraseblocks
    pub fn may_have_bad_blocks(self) -> bool {
        matches!(self, Self::Nand | Self::MlcNand)
    }
}

impl fmt::Display for FlashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable geometry of one MTD device
///
/// Produced by the resolver and only ever borrowed by the I/O engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// MTD device number
    pub dev_num: u32,
    /// Major number of the corresponding character device
    pub major: u32,
    /// Minor number of the corresponding character device
    pub minor: u32,
    /// Flash type
    pub flash_type: FlashType,
    /// Flash type string as reported by the backend
    pub type_str: TypeString,
    /// Device name
    pub name: DeviceName,
    /// Device size in bytes
    pub size: u64,
    /// Count of eraseblocks
    pub eb_cnt: u32,
    /// Eraseblock size in bytes
    pub eb_size: u32,
    /// Minimum input/output unit size
    pub min_io_size: u32,
    /// Sub-page size
    pub subpage_size: u32,
    /// OOB size (zero if the device has no OOB area)
    pub oob_size: u32,
    /// Count of additional erase regions
    pub region_cnt: u32,
    /// Whether the device accepts erase/write/mark-bad
    pub writable: bool,
    /// Whether the device may have bad eraseblocks
    pub bb_allowed: bool,
}

impl DeviceGeometry {
    /// Numeric flash type code
    pub fn type_code(&self) -> i32 {
        self.flash_type.code()
    }

    /// Absolute byte offset of eraseblock `eb`
    pub fn eb_offset(&self, eb: u32) -> u64 {
        u64::from(eb) * u64::from(self.eb_size)
    }

    /// Whether the device has an OOB area
    pub fn has_oob(&self) -> bool {
        self.oob_size != 0
    }

    /// Whether the eraseblock layout fits inside the reported size
    ///
    /// False when `eb_size` is zero or `eb_cnt * eb_size` exceeds `size`.
    pub fn is_consistent(&self) -> bool {
        if self.eb_size == 0 {
            return false;
        }
        u64::from(self.eb_cnt)
            .checked_mul(u64::from(self.eb_size))
            .is_some_and(|total| total <= self.size)
    }
}

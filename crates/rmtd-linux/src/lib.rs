//! rmtd-linux - Linux MTD (Memory Technology Device) backend
//!
//! This crate connects `rmtd-core` to the Linux MTD subsystem. Metadata
//! comes from the MTD sysfs class, or from `/proc/mtd` and `MEMGETINFO` on
//! kernels that predate it. Data access goes through the `/dev/mtdN`
//! character devices.
//!
//! # Example
//!
//! ```ignore
//! use rmtd_core::{engine, Session};
//! use rmtd_linux::{LinuxMtd, LinuxMtdConfig, MtdNode};
//!
//! let session = Session::open(LinuxMtd::new(LinuxMtdConfig::default()))?;
//! let geometry = session.device_info("/dev/mtd0")?;
//!
//! let mut node = MtdNode::open("/dev/mtd0", false)?;
//! let first_page = engine::read(&geometry, &mut node, 0, 0, geometry.min_io_size as usize)?;
//! ```
//!
//! # Usage with rmtd CLI
//!
//! ```bash
//! # Subsystem summary
//! rmtd info
//!
//! # Geometry of one device
//! rmtd dev /dev/mtd0
//!
//! # Alternate roots, e.g. inside a chroot
//! rmtd -b linux:sysfs=/mnt/sys/class/mtd,dev=/mnt/dev info
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with MTD support (`CONFIG_MTD`, `CONFIG_MTD_CHAR`)
//! - Read access to `/dev/mtdN` for reads and the legacy interface
//! - Write access for erase, write and bad-block marking
//!
//! # Device Discovery
//!
//! ```bash
//! cat /proc/mtd
//! ls /sys/class/mtd/
//! cat /sys/class/mtd/mtd0/type
//! ```

pub mod device;
pub mod error;
mod ioctl;
pub mod legacy;
pub mod metadata;

// Re-exports
pub use device::MtdNode;
pub use error::{LinuxMtdError, Result};
pub use metadata::{parse_options, LinuxMtd, LinuxMtdConfig};

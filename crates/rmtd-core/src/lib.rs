//! rmtd-core - Flash geometry and I/O discipline engine
//!
//! This crate fronts a raw flash (MTD) subsystem with four layers:
//!
//! - **Device registry** ([`Session`]): opens the subsystem and reports
//!   aggregate counts via [`Session::get_info`]
//! - **Geometry resolver** ([`Session::device_info`],
//!   [`Session::device_info_by_number`]): reads immutable per-device geometry
//! - **I/O discipline engine** ([`engine`]): eraseblock-scoped erase, read,
//!   write and bad-block operations, validated against the geometry before
//!   the backend is touched
//! - **Node prober** ([`Session::probe_node`]): cheap "is this an MTD node"
//!   check
//!
//! The OS transport is abstracted by the [`MetadataBackend`] and
//! [`DataBackend`] traits. `rmtd-linux` implements them on top of sysfs and
//! the MTD character devices, `rmtd-dummy` in memory.
//!
//! The crate is `no_std` (it needs `alloc`). Every operation is synchronous
//! and blocks for the duration of the underlying backend call. Erase in
//! particular can take tens of milliseconds; nothing here can cancel or time
//! out a blocked call.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use rmtd_core::{engine, Session};
//!
//! let session = Session::open(backend)?;
//! let geometry = session.device_info("/dev/mtd0")?;
//!
//! engine::erase(&geometry, &mut handle, 3)?;
//! engine::write(&geometry, &mut handle, 3, 0, &page)?;
//! let data = engine::read(&geometry, &mut handle, 3, 0, page.len())?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod backend;
pub mod engine;
pub mod error;
pub mod geometry;
mod probe;
pub mod registry;
mod resolver;
#[cfg(test)]
mod testing;

pub use backend::{
    BackendError, BackendResult, DataBackend, Interface, MetadataBackend, MtdFlags, NodeId,
    RawAttributes,
};
pub use engine::BadBlockState;
pub use error::{Error, Operation, Result};
pub use geometry::{BoundedString, DeviceGeometry, DeviceName, FlashType, TypeString};
pub use registry::{Session, SubsystemSummary};
pub use resolver::geometry_from_attributes;

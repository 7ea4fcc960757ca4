//! Legacy MTD interface: `/proc/mtd` plus `MEMGETINFO`
//!
//! Kernels without the sysfs MTD class only list devices in `/proc/mtd`.
//! Geometry then has to be queried from the character device itself.

use crate::error::{LinuxMtdError, Result};
use crate::ioctl::{memgetinfo, memgetregioncount, MtdInfoUser};
use log::debug;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// One line of `/proc/mtd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcEntry {
    /// MTD device number
    pub dev_num: u32,
    /// Device size in bytes
    pub size: u64,
    /// Eraseblock size in bytes
    pub eb_size: u32,
    /// Device name (without quotes)
    pub name: String,
}

/// Parse the contents of `/proc/mtd`
///
/// ```text
/// dev:    size   erasesize  name
/// mtd0: 00080000 00020000 "bootloader"
/// ```
pub fn parse_proc_mtd(content: &str) -> Result<Vec<ProcEntry>> {
    let mut entries = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("dev:") {
            continue;
        }

        let bad_line = || LinuxMtdError::ProcParse {
            line: idx + 1,
            content: line.to_string(),
        };

        let (dev, rest) = line.split_once(':').ok_or_else(bad_line)?;
        let dev_num = dev
            .strip_prefix("mtd")
            .and_then(parse_dev_num)
            .ok_or_else(bad_line)?;

        let mut fields = rest.split_whitespace();
        let size = fields
            .next()
            .and_then(|s| u64::from_str_radix(s, 16).ok())
            .ok_or_else(bad_line)?;
        let eb_size = fields
            .next()
            .and_then(|s| u32::from_str_radix(s, 16).ok())
            .ok_or_else(bad_line)?;

        // The name is quoted and may contain spaces
        let name = match (rest.find('"'), rest.rfind('"')) {
            (Some(start), Some(end)) if end > start => rest[start + 1..end].to_string(),
            _ => return Err(bad_line()),
        };

        entries.push(ProcEntry {
            dev_num,
            size,
            eb_size,
            name,
        });
    }

    Ok(entries)
}

/// Read and parse a `/proc/mtd`-format file
pub fn read_proc_mtd(path: &Path) -> Result<Vec<ProcEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| LinuxMtdError::ProcRead {
        path: path.display().to_string(),
        source: e,
    })?;
    let entries = parse_proc_mtd(&content)?;
    debug!("{}: {} MTD devices", path.display(), entries.len());
    Ok(entries)
}

/// Parse a bare decimal device number (no sign, no suffix)
pub(crate) fn parse_dev_num(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Query geometry and erase region count from an MTD character device
pub(crate) fn query_node(node: &Path) -> Result<(MtdInfoUser, u32)> {
    let file = File::open(node).map_err(|e| LinuxMtdError::OpenFailed {
        path: node.display().to_string(),
        source: e,
    })?;

    let mut info = MtdInfoUser::default();
    let mut regions: libc::c_int = 0;

    // SAFETY: the fd is open for the duration of both calls and both
    // out-pointers refer to properly sized, initialized values
    unsafe {
        memgetinfo(file.as_raw_fd(), &mut info).map_err(|e| LinuxMtdError::Ioctl {
            name: "MEMGETINFO",
            source: e,
        })?;
        memgetregioncount(file.as_raw_fd(), &mut regions).map_err(|e| {
            LinuxMtdError::Ioctl {
                name: "MEMGETREGIONCOUNT",
                source: e,
            }
        })?;
    }

    debug!(
        "{}: type={}, flags={:#x}, size={}, erasesize={}, writesize={}, oobsize={}, regions={}",
        node.display(),
        info.type_,
        info.flags,
        info.size,
        info.erasesize,
        info.writesize,
        info.oobsize,
        regions
    );

    Ok((info, regions.max(0) as u32))
}

//! Linux MTD metadata backend
//!
//! Reads device geometry from `/sys/class/mtd/mtdN/*` when the sysfs MTD
//! class exists, and falls back to `/proc/mtd` plus `MEMGETINFO` otherwise.

use crate::error::{io_to_backend, LinuxMtdError, Result};
use crate::legacy::{parse_dev_num, query_node, read_proc_mtd};
use log::{debug, warn};
use nix::sys::stat::{major, minor};
use rmtd_core::{
    BackendError, BackendResult, FlashType, Interface, MetadataBackend, MtdFlags, NodeId,
    RawAttributes,
};
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

/// Sysfs root for MTD devices
const MTD_SYSFS_ROOT: &str = "/sys/class/mtd";

/// Legacy device list
const PROC_MTD: &str = "/proc/mtd";

/// Device root
const DEV_ROOT: &str = "/dev";

/// Where the Linux MTD backend looks for things
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxMtdConfig {
    /// MTD sysfs class directory
    pub sysfs_root: PathBuf,
    /// Legacy `/proc/mtd` file
    pub proc_mtd: PathBuf,
    /// Directory holding the `mtdN` character devices
    pub dev_root: PathBuf,
}

impl Default for LinuxMtdConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(MTD_SYSFS_ROOT),
            proc_mtd: PathBuf::from(PROC_MTD),
            dev_root: PathBuf::from(DEV_ROOT),
        }
    }
}

impl LinuxMtdConfig {
    /// Configuration using the standard system locations
    pub fn new() -> Self {
        Self::default()
    }
}

/// Linux MTD metadata backend
///
/// Holds no open files: every query goes back to sysfs or `/proc/mtd`, so
/// hot-plugged devices show up immediately.
#[derive(Debug, Clone, Default)]
pub struct LinuxMtd {
    config: LinuxMtdConfig,
}

impl LinuxMtd {
    /// Create a backend with the given configuration
    pub fn new(config: LinuxMtdConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &LinuxMtdConfig {
        &self.config
    }

    /// Character device node of `dev_num`
    pub fn node_path(&self, dev_num: u32) -> PathBuf {
        self.config.dev_root.join(format!("mtd{}", dev_num))
    }

    fn sysfs_dir(&self, dev_num: u32) -> PathBuf {
        self.config.sysfs_root.join(format!("mtd{}", dev_num))
    }

    fn sysfs_devices(&self) -> Result<Vec<u32>> {
        let mut devices = Vec::new();
        for entry in fs::read_dir(&self.config.sysfs_root)? {
            let entry = entry?;
            let name = entry.file_name();
            // Skip the read-only aliases (mtdNro)
            if let Some(dev_num) = name
                .to_str()
                .and_then(|n| n.strip_prefix("mtd"))
                .and_then(parse_dev_num)
            {
                devices.push(dev_num);
            }
        }
        debug!(
            "{}: {} MTD devices",
            self.config.sysfs_root.display(),
            devices.len()
        );
        Ok(devices)
    }

    fn sysfs_attributes(&self, dev_num: u32) -> Result<RawAttributes> {
        let dir = self.sysfs_dir(dev_num);

        let flags = MtdFlags::from_bits_retain(read_sysfs_int(&dir, "flags")? as u32);
        let min_io_size = read_sysfs_u32(&dir, "writesize")?;
        // Older kernels do not export subpagesize
        let subpage_size = match read_sysfs_u32(&dir, "subpagesize") {
            Ok(size) => size,
            Err(LinuxMtdError::SysfsRead { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                min_io_size
            }
            Err(e) => return Err(e),
        };

        let attrs = RawAttributes {
            node: read_sysfs_dev(&dir)?,
            type_str: read_sysfs_text(&dir, "type")?,
            name: read_sysfs_text(&dir, "name")?,
            size: read_sysfs_int(&dir, "size")?,
            eb_size: read_sysfs_u32(&dir, "erasesize")?,
            min_io_size,
            subpage_size,
            oob_size: read_sysfs_u32(&dir, "oobsize")?,
            region_cnt: read_sysfs_u32(&dir, "numeraseregions")?,
            flags,
        };

        debug!(
            "MTD{}: name='{}', type={}, size={}, erasesize={}, writesize={}, oobsize={}, flags={:#x}",
            dev_num,
            attrs.name,
            attrs.type_str,
            attrs.size,
            attrs.eb_size,
            attrs.min_io_size,
            attrs.oob_size,
            attrs.flags.bits()
        );

        Ok(attrs)
    }

    fn legacy_attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        let entries = read_proc_mtd(&self.config.proc_mtd)?;
        let entry = entries
            .into_iter()
            .find(|e| e.dev_num == dev_num)
            .ok_or(BackendError::NotFound)?;

        let node_path = self.node_path(dev_num);
        let node = node_id(&node_path)?;
        let (info, region_cnt) = query_node(&node_path)?;

        Ok(RawAttributes {
            node,
            type_str: FlashType::from_code(i32::from(info.type_))
                .as_str()
                .to_string(),
            name: entry.name,
            size: u64::from(info.size),
            eb_size: info.erasesize,
            min_io_size: info.writesize,
            subpage_size: info.writesize,
            oob_size: info.oobsize,
            region_cnt,
            flags: MtdFlags::from_bits_retain(info.flags),
        })
    }
}

impl MetadataBackend for LinuxMtd {
    fn probe(&self) -> BackendResult<Option<Interface>> {
        match fs::metadata(&self.config.sysfs_root) {
            Ok(meta) if meta.is_dir() => return Ok(Some(Interface::Sysfs)),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_to_backend(&e)),
        }

        match fs::metadata(&self.config.proc_mtd) {
            Ok(_) => Ok(Some(Interface::Legacy)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_to_backend(&e)),
        }
    }

    fn device_numbers(&self) -> BackendResult<Vec<u32>> {
        match self.probe()? {
            Some(Interface::Sysfs) => Ok(self.sysfs_devices()?),
            Some(Interface::Legacy) => Ok(read_proc_mtd(&self.config.proc_mtd)?
                .into_iter()
                .map(|e| e.dev_num)
                .collect()),
            None => Err(BackendError::NotFound),
        }
    }

    fn node_id(&self, node: &str) -> BackendResult<NodeId> {
        let id = node_id(Path::new(node))?;
        debug!("{}: char device {}:{}", node, id.major, id.minor);
        Ok(id)
    }

    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId> {
        match self.probe()? {
            Some(Interface::Sysfs) => Ok(read_sysfs_dev(&self.sysfs_dir(dev_num))?),
            Some(Interface::Legacy) => node_id(&self.node_path(dev_num)),
            None => Err(BackendError::NotFound),
        }
    }

    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        match self.probe()? {
            Some(Interface::Sysfs) => {
                if !self.sysfs_dir(dev_num).is_dir() {
                    return Err(BackendError::NotFound);
                }
                // A missing attribute of a present device is a real error
                self.sysfs_attributes(dev_num)
                    .map_err(|e| match BackendError::from(e) {
                        BackendError::NotFound => BackendError::Os(libc::ENOENT),
                        other => other,
                    })
            }
            Some(Interface::Legacy) => self.legacy_attributes(dev_num),
            None => Err(BackendError::NotFound),
        }
    }
}

/// Major/minor of the character device at `path`
fn node_id(path: &Path) -> BackendResult<NodeId> {
    let meta = fs::metadata(path).map_err(|e| io_to_backend(&e))?;
    if !meta.file_type().is_char_device() {
        return Err(BackendError::NotCharDevice);
    }
    let rdev = meta.rdev() as libc::dev_t;
    Ok(NodeId::new(major(rdev) as u32, minor(rdev) as u32))
}

/// Read a sysfs attribute as raw bytes
fn read_sysfs_bytes(dir: &Path, filename: &str) -> Result<Vec<u8>> {
    let path = dir.join(filename);
    fs::read(&path).map_err(|e| LinuxMtdError::SysfsRead {
        path: path.display().to_string(),
        source: e,
    })
}

/// Read a free-form text attribute such as `name` or `type`
///
/// Only the newline sysfs appends is removed. Bytes that are not valid
/// UTF-8 become U+FFFD.
fn read_sysfs_text(dir: &Path, filename: &str) -> Result<String> {
    let bytes = read_sysfs_bytes(dir, filename)?;
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(&bytes);
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Read a numeric attribute, keeping the printable ASCII prefix
fn read_sysfs_value(dir: &Path, filename: &str) -> Result<String> {
    let bytes = read_sysfs_bytes(dir, filename)?;
    let sanitized: String = bytes
        .iter()
        .map(|&b| b as char)
        .take_while(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    Ok(sanitized.trim_end().to_string())
}

/// Read an integer from a sysfs file
fn read_sysfs_int(dir: &Path, filename: &str) -> Result<u64> {
    let value_str = read_sysfs_value(dir, filename)?;

    // Support hex (0x...) and decimal
    let value = if let Some(hex) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        value_str.parse::<u64>()
    };

    value.map_err(|_| LinuxMtdError::SysfsParse {
        path: dir.join(filename).display().to_string(),
        value: value_str,
    })
}

/// Read an integer that must fit in 32 bits
fn read_sysfs_u32(dir: &Path, filename: &str) -> Result<u32> {
    let value = read_sysfs_int(dir, filename)?;
    u32::try_from(value).map_err(|_| LinuxMtdError::SysfsParse {
        path: dir.join(filename).display().to_string(),
        value: value.to_string(),
    })
}

/// Read the `major:minor` pair from a sysfs `dev` file
fn read_sysfs_dev(dir: &Path) -> Result<NodeId> {
    let value = read_sysfs_value(dir, "dev")?;
    parse_major_minor(&value).ok_or_else(|| LinuxMtdError::SysfsParse {
        path: dir.join("dev").display().to_string(),
        value,
    })
}

fn parse_major_minor(s: &str) -> Option<NodeId> {
    let (major, minor) = s.split_once(':')?;
    Some(NodeId::new(major.parse().ok()?, minor.parse().ok()?))
}

/// Build a configuration from programmer-style `key=value` options
///
/// # Supported options
/// - `sysfs=PATH` - MTD sysfs class directory (default `/sys/class/mtd`)
/// - `proc=PATH` - legacy device list (default `/proc/mtd`)
/// - `dev=PATH` - directory holding `mtdN` nodes (default `/dev`)
///
/// # Example
/// ```ignore
/// let config = parse_options(&[("sysfs", "/tmp/fake-sysfs")])?;
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxMtdConfig> {
    let mut config = LinuxMtdConfig::default();

    for (key, value) in options {
        let (name, slot) = match *key {
            "sysfs" => ("sysfs", &mut config.sysfs_root),
            "proc" => ("proc", &mut config.proc_mtd),
            "dev" => ("dev", &mut config.dev_root),
            _ => {
                warn!("Unknown linux MTD option: {}={}", key, value);
                continue;
            }
        };
        if value.is_empty() {
            return Err(LinuxMtdError::InvalidParameter {
                name,
                message: "path must not be empty".to_string(),
            });
        }
        *slot = PathBuf::from(value);
    }

    Ok(config)
}

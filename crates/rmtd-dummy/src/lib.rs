//! rmtd-dummy - In-memory MTD subsystem emulator for testing
//!
//! This crate emulates an MTD subsystem and its devices in memory, so the
//! registry, resolver, prober and I/O engine can be exercised without
//! flash hardware or root access.
//!
//! [`DummySubsystem`] answers metadata queries and supports hot-plug
//! (devices can be added and removed while a session is open).
//! [`DummySubsystem::open_device`] hands out a [`DummyFlash`], which behaves
//! like an open `/dev/mtdN` node: erase sets bytes to 0xFF, programming can
//! only clear bits, NAND keeps a bad-block table and NOR rejects bad-block
//! queries. Faults can be injected per eraseblock.

use log::debug;
use rmtd_core::{
    BackendError, BackendResult, DataBackend, FlashType, Interface, MetadataBackend, MtdFlags,
    NodeId, RawAttributes,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Character major of MTD nodes
pub const MTD_CHAR_MAJOR: u32 = 90;

const EIO: i32 = 5;
const EBADF: i32 = 9;
const EINVAL: i32 = 22;
const ENOSPC: i32 = 28;
const EROFS: i32 = 30;
const EOPNOTSUPP: i32 = 95;

/// Geometry of one emulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyDeviceConfig {
    /// Device name
    pub name: String,
    /// Flash type
    pub flash_type: FlashType,
    /// Size in bytes
    pub size: u64,
    /// Eraseblock size in bytes
    pub eb_size: u32,
    /// Minimum I/O unit
    pub min_io_size: u32,
    /// Sub-page size
    pub subpage_size: u32,
    /// OOB bytes per page
    pub oob_size: u32,
    /// Whether the device accepts erase and write
    pub writable: bool,
}

impl DummyDeviceConfig {
    /// A NOR device with byte-granular writes
    pub fn nor(name: &str, size: u64, eb_size: u32) -> Self {
        Self {
            name: name.to_string(),
            flash_type: FlashType::Nor,
            size,
            eb_size,
            min_io_size: 1,
            subpage_size: 1,
            oob_size: 0,
            writable: true,
        }
    }

    /// A NAND device with page-granular writes
    pub fn nand(name: &str, size: u64, eb_size: u32, page_size: u32, oob_size: u32) -> Self {
        Self {
            name: name.to_string(),
            flash_type: FlashType::Nand,
            size,
            eb_size,
            min_io_size: page_size,
            subpage_size: page_size,
            oob_size,
            writable: true,
        }
    }

    /// Same device, but not writable
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    fn flags(&self) -> MtdFlags {
        let mut flags = MtdFlags::empty();
        if self.writable {
            flags |= MtdFlags::WRITEABLE;
            if self.flash_type == FlashType::Nor {
                flags |= MtdFlags::BIT_WRITEABLE;
            }
        }
        flags
    }

    fn eb_cnt(&self) -> u32 {
        if self.eb_size == 0 {
            0
        } else {
            (self.size / u64::from(self.eb_size)) as u32
        }
    }
}

/// Configuration of the emulated subsystem
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Devices present at start, by device number
    pub devices: BTreeMap<u32, DummyDeviceConfig>,
    /// Expose the sysfs interface (otherwise legacy)
    pub sysfs: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(0, DummyDeviceConfig::nor("dummy-nor", 1024 * 1024, 64 * 1024));
        devices.insert(
            1,
            DummyDeviceConfig::nand("dummy-nand", 32 * 1024 * 1024, 128 * 1024, 2048, 64),
        );
        Self {
            devices,
            sysfs: true,
        }
    }
}

impl DummyConfig {
    /// A subsystem without devices
    pub fn empty() -> Self {
        Self {
            devices: BTreeMap::new(),
            sysfs: true,
        }
    }

    /// Add a device
    pub fn with_device(mut self, dev_num: u32, device: DummyDeviceConfig) -> Self {
        self.devices.insert(dev_num, device);
        self
    }
}

/// Parse backend options (`nor=SIZE`, `nand=SIZE`, `legacy`, `empty`)
///
/// Sizes accept `K` and `M` suffixes. Every `nor`/`nand` option adds one
/// device with the next free number; without any, the default layout is
/// used.
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig, String> {
    let mut config = DummyConfig::empty();
    let mut custom = false;

    for (key, value) in options {
        let free = config
            .devices
            .keys()
            .next_back()
            .map_or(Some(0), |n| n.checked_add(1));
        let next = || free.ok_or_else(|| "no free device number".to_string());
        match *key {
            "nor" => {
                let size = parse_size(value)?;
                config
                    .devices
                    .insert(next()?, DummyDeviceConfig::nor("dummy-nor", size, 64 * 1024));
                custom = true;
            }
            "nand" => {
                let size = parse_size(value)?;
                config.devices.insert(
                    next()?,
                    DummyDeviceConfig::nand("dummy-nand", size, 128 * 1024, 2048, 64),
                );
                custom = true;
            }
            "legacy" => config.sysfs = false,
            "empty" => custom = true,
            _ => return Err(format!("unknown dummy option: {}", key)),
        }
    }

    if !custom {
        config.devices = DummyConfig::default().devices;
    }
    Ok(config)
}

fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, mult) = match s.as_bytes().last() {
        Some(b'K' | b'k') => (&s[..s.len() - 1], 1024),
        Some(b'M' | b'm') => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(mult))
        .filter(|&n| n > 0)
        .ok_or_else(|| format!("invalid size: {}", s))
}

/// Node path of device `dev_num`
pub fn node_path(dev_num: u32) -> String {
    format!("/dev/mtd{}", dev_num)
}

/// Node of `mtdN`; numbers without a representable minor give `EINVAL`
fn mtd_node_id(dev_num: u32) -> BackendResult<NodeId> {
    dev_num
        .checked_mul(2)
        .map(|minor| NodeId::new(MTD_CHAR_MAJOR, minor))
        .ok_or(BackendError::Os(EINVAL))
}

/// Per-device state shared between the subsystem and open handles
#[derive(Debug)]
struct DeviceState {
    config: DummyDeviceConfig,
    data: Vec<u8>,
    bad: Vec<bool>,
    erase_faults: BTreeMap<u32, i32>,
    short_transfers: bool,
    calls: usize,
}

impl DeviceState {
    fn new(config: DummyDeviceConfig) -> Self {
        let data = vec![0xFF; config.size as usize];
        let bad = vec![false; config.eb_cnt() as usize];
        Self {
            config,
            data,
            bad,
            erase_faults: BTreeMap::new(),
            short_transfers: false,
            calls: 0,
        }
    }

    fn eb_index(&self, offset: u64) -> Result<usize, i32> {
        let eb_size = u64::from(self.config.eb_size);
        if eb_size == 0 || offset % eb_size != 0 {
            return Err(EINVAL);
        }
        let eb = offset / eb_size;
        if eb >= self.bad.len() as u64 {
            return Err(EINVAL);
        }
        Ok(eb as usize)
    }
}

type SharedDevice = Arc<Mutex<DeviceState>>;

fn lock(device: &SharedDevice) -> MutexGuard<'_, DeviceState> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct SubsystemState {
    present: bool,
    sysfs: bool,
    devices: BTreeMap<u32, SharedDevice>,
    // Non-MTD nodes: Some(id) for character devices, None for regular files
    other_nodes: BTreeMap<String, Option<NodeId>>,
}

/// Emulated MTD subsystem
///
/// All methods take `&self`, so a [`rmtd_core::Session`] can borrow the
/// subsystem while a test adds or removes devices underneath it.
#[derive(Debug)]
pub struct DummySubsystem {
    state: RwLock<SubsystemState>,
}

impl DummySubsystem {
    /// Create a subsystem from `config`
    pub fn new(config: DummyConfig) -> Self {
        let devices = config
            .devices
            .into_iter()
            .map(|(n, cfg)| (n, Arc::new(Mutex::new(DeviceState::new(cfg)))))
            .collect();

        let mut other_nodes = BTreeMap::new();
        other_nodes.insert("/dev/null".to_string(), Some(NodeId::new(1, 3)));
        other_nodes.insert("/dev/zero".to_string(), Some(NodeId::new(1, 5)));
        other_nodes.insert("/etc/passwd".to_string(), None);

        Self {
            state: RwLock::new(SubsystemState {
                present: true,
                sysfs: config.sysfs,
                devices,
                other_nodes,
            }),
        }
    }

    /// Create a subsystem with the default devices
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SubsystemState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SubsystemState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plug in a device, replacing any device with the same number
    pub fn add_device(&self, dev_num: u32, config: DummyDeviceConfig) {
        debug!("dummy: adding mtd{} ({})", dev_num, config.name);
        self.write_state()
            .devices
            .insert(dev_num, Arc::new(Mutex::new(DeviceState::new(config))));
    }

    /// Unplug a device; returns whether it was present
    ///
    /// Open handles keep working on the detached device.
    pub fn remove_device(&self, dev_num: u32) -> bool {
        debug!("dummy: removing mtd{}", dev_num);
        self.write_state().devices.remove(&dev_num).is_some()
    }

    /// Load or unload the whole subsystem
    pub fn set_present(&self, present: bool) {
        self.write_state().present = present;
    }

    /// Switch between the sysfs and legacy interface
    pub fn set_sysfs(&self, sysfs: bool) {
        self.write_state().sysfs = sysfs;
    }

    /// Register a non-MTD path (`None` makes it a regular file)
    pub fn add_other_node(&self, path: &str, id: Option<NodeId>) {
        self.write_state().other_nodes.insert(path.to_string(), id);
    }

    /// Open a data handle on device `dev_num`
    ///
    /// `write` mirrors the open mode of a real node: a read-only handle
    /// refuses modifying calls with `EBADF`.
    pub fn open_device(&self, dev_num: u32, write: bool) -> Option<DummyFlash> {
        let device = self.read_state().devices.get(&dev_num).cloned()?;
        debug!("dummy: opened mtd{} (write={})", dev_num, write);
        Some(DummyFlash { device, write })
    }
}

impl Default for DummySubsystem {
    fn default() -> Self {
        Self::new_default()
    }
}

impl MetadataBackend for DummySubsystem {
    fn probe(&self) -> BackendResult<Option<Interface>> {
        let state = self.read_state();
        if !state.present {
            return Ok(None);
        }
        Ok(Some(if state.sysfs {
            Interface::Sysfs
        } else {
            Interface::Legacy
        }))
    }

    fn device_numbers(&self) -> BackendResult<Vec<u32>> {
        let state = self.read_state();
        if !state.present {
            return Err(BackendError::NotFound);
        }
        Ok(state.devices.keys().copied().collect())
    }

    fn node_id(&self, node: &str) -> BackendResult<NodeId> {
        let state = self.read_state();

        if let Some(other) = state.other_nodes.get(node) {
            return other.ok_or(BackendError::NotCharDevice);
        }

        let suffix = node.strip_prefix("/dev/mtd").ok_or(BackendError::NotFound)?;
        let (digits, read_only) = match suffix.strip_suffix("ro") {
            Some(digits) => (digits, true),
            None => (suffix, false),
        };
        let dev_num: u32 = digits
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| digits.parse().ok())
            .flatten()
            .ok_or(BackendError::NotFound)?;

        if !state.present || !state.devices.contains_key(&dev_num) {
            return Err(BackendError::NotFound);
        }

        let id = mtd_node_id(dev_num)?;
        if !read_only {
            return Ok(id);
        }
        id.minor
            .checked_add(1)
            .map(|minor| NodeId::new(id.major, minor))
            .ok_or(BackendError::Os(EINVAL))
    }

    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId> {
        let state = self.read_state();
        if !state.present || !state.devices.contains_key(&dev_num) {
            return Err(BackendError::NotFound);
        }
        mtd_node_id(dev_num)
    }

    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        let state = self.read_state();
        if !state.present {
            return Err(BackendError::NotFound);
        }
        let device = state.devices.get(&dev_num).ok_or(BackendError::NotFound)?;
        let device = lock(device);
        let config = &device.config;

        Ok(RawAttributes {
            node: mtd_node_id(dev_num)?,
            type_str: config.flash_type.as_str().to_string(),
            name: config.name.clone(),
            size: config.size,
            eb_size: config.eb_size,
            min_io_size: config.min_io_size,
            subpage_size: config.subpage_size,
            oob_size: config.oob_size,
            region_cnt: 0,
            flags: config.flags(),
        })
    }
}

/// Open handle on an emulated device
#[derive(Debug, Clone)]
pub struct DummyFlash {
    device: SharedDevice,
    write: bool,
}

impl DummyFlash {
    /// Copy of the whole device contents
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.device).data.clone()
    }

    /// Set or clear the bad mark of eraseblock `eb` behind the engine's back
    pub fn set_bad(&self, eb: u32, bad: bool) {
        if let Some(slot) = lock(&self.device).bad.get_mut(eb as usize) {
            *slot = bad;
        }
    }

    /// Make every erase of eraseblock `eb` fail with `code`
    pub fn inject_erase_fault(&self, eb: u32, code: i32) {
        lock(&self.device).erase_faults.insert(eb, code);
    }

    /// Make reads and writes transfer one byte less than asked
    pub fn set_short_transfers(&self, short: bool) {
        lock(&self.device).short_transfers = short;
    }

    /// How many data calls reached this device
    pub fn call_count(&self) -> usize {
        lock(&self.device).calls
    }

    fn check_modify(&self, state: &DeviceState) -> Result<(), i32> {
        if !self.write {
            return Err(EBADF);
        }
        if !state.config.writable {
            return Err(EROFS);
        }
        Ok(())
    }
}

impl DataBackend for DummyFlash {
    fn erase(&mut self, offset: u64, len: u32) -> Result<(), i32> {
        let mut state = lock(&self.device);
        state.calls += 1;
        self.check_modify(&state)?;

        let eb = state.eb_index(offset)?;
        if len != state.config.eb_size {
            return Err(EINVAL);
        }
        if let Some(&code) = state.erase_faults.get(&(eb as u32)) {
            return Err(code);
        }
        if state.bad[eb] {
            return Err(EIO);
        }

        let start = offset as usize;
        state.data[start..start + len as usize].fill(0xFF);
        Ok(())
    }

    fn is_bad(&mut self, offset: u64) -> Result<bool, i32> {
        let mut state = lock(&self.device);
        state.calls += 1;
        if !state.config.flash_type.may_have_bad_blocks() {
            return Err(EOPNOTSUPP);
        }
        let eb = state.eb_index(offset)?;
        Ok(state.bad[eb])
    }

    fn mark_bad(&mut self, offset: u64) -> Result<(), i32> {
        let mut state = lock(&self.device);
        state.calls += 1;
        if !state.config.flash_type.may_have_bad_blocks() {
            return Err(EOPNOTSUPP);
        }
        self.check_modify(&state)?;
        let eb = state.eb_index(offset)?;
        state.bad[eb] = true;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, i32> {
        let mut state = lock(&self.device);
        state.calls += 1;
        if offset >= state.config.size {
            return Ok(0);
        }

        let start = offset as usize;
        let mut n = buf.len().min(state.data.len() - start);
        if state.short_transfers {
            n = n.saturating_sub(1);
        }
        buf[..n].copy_from_slice(&state.data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize, i32> {
        let mut state = lock(&self.device);
        state.calls += 1;
        self.check_modify(&state)?;

        let min_io = u64::from(state.config.min_io_size.max(1));
        if offset % min_io != 0 || data.len() as u64 % min_io != 0 {
            return Err(EINVAL);
        }
        if offset >= state.config.size {
            return Err(ENOSPC);
        }

        let start = offset as usize;
        let mut n = data.len().min(state.data.len() - start);
        if state.short_transfers {
            n = n.saturating_sub(1);
        }
        // Programming can only clear bits
        for (dst, &src) in state.data[start..start + n].iter_mut().zip(data) {
            *dst &= src;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmtd_core::{engine, BadBlockState, Error, Operation, Session};

    const NOR: u32 = 0;
    const NAND: u32 = 1;

    #[test]
    fn test_default_layout() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();

        let info = session.get_info().unwrap();
        assert_eq!(info.dev_count, 2);
        assert_eq!(info.lowest_dev_num, Some(0));
        assert_eq!(info.highest_dev_num, Some(1));
        assert!(info.sysfs_supported);

        let nor = session.device_info_by_number(NOR).unwrap();
        assert_eq!(nor.flash_type, FlashType::Nor);
        assert_eq!(nor.type_code(), 3);
        assert_eq!(nor.eb_cnt, 16);
        assert!(nor.writable);
        assert!(!nor.bb_allowed);

        let nand = session.device_info("/dev/mtd1").unwrap();
        assert_eq!(nand.name, "dummy-nand");
        assert_eq!(nand.eb_cnt, 256);
        assert_eq!(nand.min_io_size, 2048);
        assert_eq!(nand.oob_size, 64);
        assert_eq!((nand.major, nand.minor), (90, 2));
        assert!(nand.bb_allowed);
    }

    #[test]
    fn test_erase_write_read_cycle() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NAND).unwrap();
        let mut flash = subsystem.open_device(NAND, true).unwrap();

        let page: Vec<u8> = (0..2048u32).map(|i| i as u8).collect();
        engine::erase(&geo, &mut flash, 5).unwrap();
        engine::write(&geo, &mut flash, 5, 2048, &page).unwrap();

        assert_eq!(engine::read(&geo, &mut flash, 5, 2048, 2048).unwrap(), page);
        // Untouched pages stay erased
        let first = engine::read(&geo, &mut flash, 5, 0, 2048).unwrap();
        assert!(first.iter().all(|&b| b == 0xFF));

        // Programming without an erase only clears bits
        engine::write(&geo, &mut flash, 5, 2048, &[0x0F; 2048]).unwrap();
        let merged = engine::read(&geo, &mut flash, 5, 2048, 4).unwrap();
        assert_eq!(merged, [0x00, 0x01, 0x02, 0x03]);

        engine::erase(&geo, &mut flash, 5).unwrap();
        let erased = engine::read(&geo, &mut flash, 5, 2048, 2048).unwrap();
        assert!(erased.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_bad_block_lifecycle() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NAND).unwrap();
        let mut flash = subsystem.open_device(NAND, true).unwrap();

        assert_eq!(engine::is_bad(&geo, &mut flash, 7), Ok(BadBlockState::Good));
        engine::mark_bad(&geo, &mut flash, 7).unwrap();
        assert_eq!(engine::is_bad(&geo, &mut flash, 7), Ok(BadBlockState::Bad));

        // A bad block refuses erase; the failure is reported, not reclassified
        assert_eq!(
            engine::erase(&geo, &mut flash, 7),
            Err(Error::IoFailure {
                op: Operation::Erase,
                eb: 7,
                code: EIO
            })
        );
        assert_eq!(engine::is_bad(&geo, &mut flash, 8), Ok(BadBlockState::Good));
    }

    #[test]
    fn test_nor_bad_block_queries() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NOR).unwrap();
        let mut flash = subsystem.open_device(NOR, true).unwrap();

        // The device itself would answer EOPNOTSUPP; the engine never asks
        assert_eq!(engine::is_bad(&geo, &mut flash, 0), Ok(BadBlockState::Good));
        assert_eq!(engine::mark_bad(&geo, &mut flash, 0), Err(Error::Unsupported));
        assert_eq!(flash.call_count(), 0);
        assert_eq!(flash.is_bad(0), Err(EOPNOTSUPP));
    }

    #[test]
    fn test_out_of_range_never_reaches_device() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NAND).unwrap();
        let mut flash = subsystem.open_device(NAND, true).unwrap();

        assert_eq!(
            engine::erase(&geo, &mut flash, geo.eb_cnt),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            engine::read(&geo, &mut flash, 0, geo.eb_size - 2048, 4096),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            engine::write(&geo, &mut flash, 0, geo.eb_size, &[0; 2048]),
            Err(Error::InvalidArgument)
        );
        assert_eq!(flash.call_count(), 0);
    }

    #[test]
    fn test_unaligned_write_rejected_by_device() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NAND).unwrap();
        let mut flash = subsystem.open_device(NAND, true).unwrap();

        assert_eq!(
            engine::write(&geo, &mut flash, 0, 100, &[0; 2048]),
            Err(Error::IoFailure {
                op: Operation::Write,
                eb: 0,
                code: EINVAL
            })
        );
        assert_eq!(flash.call_count(), 1);
    }

    #[test]
    fn test_read_only_device() {
        let subsystem = DummySubsystem::new(
            DummyConfig::empty()
                .with_device(4, DummyDeviceConfig::nor("rom", 256 * 1024, 64 * 1024).read_only()),
        );
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info("/dev/mtd4").unwrap();
        assert!(!geo.writable);

        let mut flash = subsystem.open_device(4, true).unwrap();
        assert_eq!(engine::erase(&geo, &mut flash, 0), Err(Error::ReadOnlyDevice));
        assert_eq!(
            engine::write(&geo, &mut flash, 0, 0, b"x"),
            Err(Error::ReadOnlyDevice)
        );
        assert!(engine::read(&geo, &mut flash, 3, 0, 16).is_ok());
    }

    #[test]
    fn test_read_only_handle() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NOR).unwrap();
        let mut flash = subsystem.open_device(NOR, false).unwrap();

        assert_eq!(
            engine::erase(&geo, &mut flash, 0),
            Err(Error::IoFailure {
                op: Operation::Erase,
                eb: 0,
                code: EBADF
            })
        );
    }

    #[test]
    fn test_injected_faults() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();
        let geo = session.device_info_by_number(NOR).unwrap();
        let mut flash = subsystem.open_device(NOR, true).unwrap();

        flash.inject_erase_fault(2, EIO);
        assert_eq!(
            engine::erase(&geo, &mut flash, 2),
            Err(Error::IoFailure {
                op: Operation::Erase,
                eb: 2,
                code: EIO
            })
        );
        engine::erase(&geo, &mut flash, 3).unwrap();

        flash.set_short_transfers(true);
        assert_eq!(
            engine::read(&geo, &mut flash, 3, 0, 64),
            Err(Error::IoFailure {
                op: Operation::Read,
                eb: 3,
                code: EIO
            })
        );
        assert_eq!(
            engine::write(&geo, &mut flash, 3, 0, &[0; 64]),
            Err(Error::IoFailure {
                op: Operation::Write,
                eb: 3,
                code: EIO
            })
        );
    }

    #[test]
    fn test_probe_node() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();

        assert_eq!(session.probe_node("/dev/mtd1"), Ok(1));
        assert_eq!(session.probe_node("/dev/mtd1ro"), Err(Error::NotADevice));
        assert_eq!(session.probe_node("/dev/null"), Err(Error::NotADevice));
        assert_eq!(session.probe_node("/etc/passwd"), Err(Error::NotADevice));
        assert_eq!(session.probe_node("/dev/mtd9"), Err(Error::NoSuchDevice));
    }

    #[test]
    fn test_device_info_errors() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();

        assert_eq!(session.device_info("/dev/null"), Err(Error::NoSuchDevice));
        assert_eq!(session.device_info("/dev/mtd7"), Err(Error::NoSuchDevice));
        assert_eq!(
            session.device_info_by_number(7),
            Err(Error::NoSuchDevice)
        );
    }

    #[test]
    fn test_hot_plug() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();

        subsystem.add_device(7, DummyDeviceConfig::nor("late", 512 * 1024, 64 * 1024));
        let info = session.get_info().unwrap();
        assert_eq!(info.dev_count, 3);
        assert_eq!(info.highest_dev_num, Some(7));
        assert_eq!(session.device_info("/dev/mtd7").unwrap().name, "late");

        let geo = session.device_info_by_number(NOR).unwrap();
        let mut flash = subsystem.open_device(NOR, true).unwrap();
        assert!(subsystem.remove_device(NOR));
        assert_eq!(
            session.device_info_by_number(NOR),
            Err(Error::NoSuchDevice)
        );
        assert_eq!(session.get_info().unwrap().lowest_dev_num, Some(1));

        // An already open handle outlives the removal
        engine::erase(&geo, &mut flash, 0).unwrap();
        assert!(subsystem.open_device(NOR, true).is_none());
    }

    #[test]
    fn test_device_number_without_minor() {
        let big = 3_000_000_000;
        let subsystem = DummySubsystem::new(
            DummyConfig::empty()
                .with_device(big, DummyDeviceConfig::nor("big", 64 * 1024, 64 * 1024)),
        );
        let session = Session::open(&subsystem).unwrap();

        assert_eq!(session.get_info().unwrap().dev_count, 1);
        assert_eq!(
            session.device_info_by_number(big),
            Err(Error::SystemError(EINVAL))
        );
        assert_eq!(
            session.device_info("/dev/mtd3000000000"),
            Err(Error::SystemError(EINVAL))
        );
        assert_eq!(
            subsystem.node_id("/dev/mtd3000000000ro"),
            Err(BackendError::Os(EINVAL))
        );

        let last = DummySubsystem::new(
            DummyConfig::empty()
                .with_device(u32::MAX, DummyDeviceConfig::nor("last", 64 * 1024, 64 * 1024)),
        );
        assert_eq!(
            Session::open(&last).unwrap().device_info_by_number(u32::MAX),
            Err(Error::SystemError(EINVAL))
        );
    }

    #[test]
    fn test_get_info_while_devices_come_and_go() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for n in 2..64 {
                    let config = DummyDeviceConfig::nor("hotplug", 128 * 1024, 64 * 1024);
                    subsystem.add_device(n, config);
                    assert!(subsystem.remove_device(n));
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let info = session.get_info().unwrap();
                        assert!((2..=3).contains(&info.dev_count));
                        assert_eq!(info.lowest_dev_num, Some(NOR));
                        let nand = session.device_info_by_number(NAND).unwrap();
                        assert_eq!(nand.eb_cnt, 256);
                    }
                });
            }
        });

        assert_eq!(session.get_info().unwrap().dev_count, 2);
    }

    #[test]
    fn test_subsystem_disappears() {
        let subsystem = DummySubsystem::new_default();
        let session = Session::open(&subsystem).unwrap();

        subsystem.set_present(false);
        assert_eq!(session.get_info(), Err(Error::SubsystemAbsent));

        let absent = DummySubsystem::new_default();
        absent.set_present(false);
        assert_eq!(Session::open(&absent).err(), Some(Error::SubsystemAbsent));
    }

    #[test]
    fn test_legacy_interface() {
        let subsystem = DummySubsystem::new(DummyConfig {
            sysfs: false,
            ..DummyConfig::default()
        });
        let session = Session::open(&subsystem).unwrap();

        assert_eq!(session.interface(), Interface::Legacy);
        assert!(!session.get_info().unwrap().sysfs_supported);
        // Geometry is identical either way
        subsystem.set_sysfs(true);
        let sysfs = session.device_info_by_number(NAND).unwrap();
        subsystem.set_sysfs(false);
        assert_eq!(session.device_info_by_number(NAND).unwrap(), sysfs);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert!(config.sysfs);

        let config = parse_options(&[("nor", "256K"), ("nand", "64M"), ("legacy", "")]).unwrap();
        assert_eq!(config.devices[&0].size, 256 * 1024);
        assert_eq!(config.devices[&1].flash_type, FlashType::Nand);
        assert_eq!(config.devices[&1].size, 64 * 1024 * 1024);
        assert!(!config.sysfs);

        assert!(parse_options(&[("empty", "")]).unwrap().devices.is_empty());
        assert!(parse_options(&[("nor", "lots")]).is_err());
        assert!(parse_options(&[("nor", "0")]).is_err());
        assert!(parse_options(&[("bogus", "1")]).is_err());
    }

    #[test]
    fn test_parse_options_numbers_devices_in_order() {
        let config = parse_options(&[("nand", "1M"), ("nor", "64K"), ("nor", "128K")]).unwrap();
        assert_eq!(config.devices.keys().copied().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(config.devices[&2].size, 128 * 1024);
    }
}

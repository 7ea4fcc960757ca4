//! Stub backends for unit tests

use crate::backend::{
    BackendError, BackendResult, DataBackend, Interface, MetadataBackend, MtdFlags, NodeId,
    RawAttributes,
};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;

/// Attributes of a 32 MiB NAND device with 128 KiB eraseblocks
pub fn nand_attributes(dev_num: u32) -> RawAttributes {
    RawAttributes {
        node: NodeId::new(90, dev_num * 2),
        type_str: "nand".to_string(),
        name: "rootfs".to_string(),
        size: 32 * 1024 * 1024,
        eb_size: 128 * 1024,
        min_io_size: 2048,
        subpage_size: 512,
        oob_size: 64,
        region_cnt: 0,
        flags: MtdFlags::WRITEABLE,
    }
}

enum Node {
    Char(NodeId),
    Regular,
}

/// Metadata backend serving a fixed device table
pub struct StubMetadata {
    pub interface: Option<Interface>,
    pub devices: BTreeMap<u32, RawAttributes>,
    pub fail_attributes: Option<i32>,
    pub fail_probe: Option<i32>,
    nodes: BTreeMap<String, Node>,
    attribute_reads: Cell<u32>,
}

impl StubMetadata {
    pub fn with_devices(dev_nums: &[u32]) -> Self {
        let mut stub = Self {
            interface: Some(Interface::Sysfs),
            devices: BTreeMap::new(),
            fail_attributes: None,
            fail_probe: None,
            nodes: BTreeMap::new(),
            attribute_reads: Cell::new(0),
        };
        for &dev_num in dev_nums {
            let attrs = nand_attributes(dev_num);
            let path = stub.node_path(dev_num);
            stub.add_node(&path, attrs.node);
            stub.devices.insert(dev_num, attrs);
        }
        stub
    }

    pub fn node_path(&self, dev_num: u32) -> String {
        format!("/dev/mtd{}", dev_num)
    }

    pub fn add_node(&mut self, path: &str, id: NodeId) {
        self.nodes.insert(path.to_string(), Node::Char(id));
    }

    pub fn add_regular_file(&mut self, path: &str) {
        self.nodes.insert(path.to_string(), Node::Regular);
    }

    pub fn attribute_reads(&self) -> u32 {
        self.attribute_reads.get()
    }
}

impl MetadataBackend for StubMetadata {
    fn probe(&self) -> BackendResult<Option<Interface>> {
        match self.fail_probe {
            Some(code) => Err(BackendError::Os(code)),
            None => Ok(self.interface),
        }
    }

    fn device_numbers(&self) -> BackendResult<Vec<u32>> {
        if self.interface.is_none() {
            return Err(BackendError::NotFound);
        }
        // Reverse order: the session must not rely on backend ordering
        Ok(self.devices.keys().rev().copied().collect())
    }

    fn node_id(&self, node: &str) -> BackendResult<NodeId> {
        match self.nodes.get(node) {
            Some(Node::Char(id)) => Ok(*id),
            Some(Node::Regular) => Err(BackendError::NotCharDevice),
            None => Err(BackendError::NotFound),
        }
    }

    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId> {
        self.devices
            .get(&dev_num)
            .map(|attrs| attrs.node)
            .ok_or(BackendError::NotFound)
    }

    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        self.attribute_reads.set(self.attribute_reads.get() + 1);
        if let Some(code) = self.fail_attributes {
            return Err(BackendError::Os(code));
        }
        self.devices
            .get(&dev_num)
            .cloned()
            .ok_or(BackendError::NotFound)
    }
}

/// A call that reached [`RecordingData`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Erase(u64, u32),
    IsBad(u64),
    MarkBad(u64),
    Read(u64, usize),
    Write(u64, usize),
}

/// Data backend that records every call it receives
#[derive(Default)]
pub struct RecordingData {
    pub calls: Vec<Call>,
    pub fail_with: Option<i32>,
    pub short: bool,
    pub bad: bool,
    pub universal: bool,
}

impl RecordingData {
    fn result(&self) -> core::result::Result<(), i32> {
        match self.fail_with {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn transferred(&self, len: usize) -> usize {
        if self.short {
            len.saturating_sub(1)
        } else {
            len
        }
    }
}

impl DataBackend for RecordingData {
    fn erase(&mut self, offset: u64, len: u32) -> core::result::Result<(), i32> {
        self.calls.push(Call::Erase(offset, len));
        self.result()
    }

    fn is_bad(&mut self, offset: u64) -> core::result::Result<bool, i32> {
        self.calls.push(Call::IsBad(offset));
        self.result().map(|_| self.bad)
    }

    fn mark_bad(&mut self, offset: u64) -> core::result::Result<(), i32> {
        self.calls.push(Call::MarkBad(offset));
        self.result()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> core::result::Result<usize, i32> {
        self.calls.push(Call::Read(offset, buf.len()));
        self.result()?;
        buf.fill(0xA5);
        Ok(self.transferred(buf.len()))
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> core::result::Result<usize, i32> {
        self.calls.push(Call::Write(offset, data.len()));
        self.result()?;
        Ok(self.transferred(data.len()))
    }

    fn universal_bad_block_query(&self) -> bool {
        self.universal
    }
}

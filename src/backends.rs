//! Backend registration and dispatch
//!
//! This module provides a centralized registry for the metadata/data
//! backends the CLI can drive, with feature-gated inclusion and help text
//! generated from what was compiled in.

use rmtd_core::{
    BackendResult, DataBackend, DeviceGeometry, Interface, MetadataBackend, NodeId, RawAttributes,
    Session,
};

#[cfg(not(any(feature = "linux", feature = "dummy")))]
compile_error!("at least one backend feature (linux, dummy) must be enabled");

/// Backend used when `--backend` is not given
#[cfg(feature = "linux")]
pub const DEFAULT_BACKEND: &str = "linux";
#[cfg(not(feature = "linux"))]
pub const DEFAULT_BACKEND: &str = "dummy";

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// All backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "linux")]
    backends.push(BackendInfo {
        name: "linux",
        aliases: &["linux_mtd", "linux-mtd"],
        description: "Linux MTD subsystem (sysfs=<dir>,proc=<file>,dev=<dir>)",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory MTD emulator (nor=<size>,nand=<size>,legacy,empty)",
    });

    backends
}

/// Short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
    names.join(", ")
}

fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.iter().any(|a| *a == name))
        .map(|b| b.name)
}

/// Parsed backend string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendParams {
    /// Backend name as given
    pub name: String,
    /// Options in the order given; bare flags have an empty value
    pub options: Vec<(String, String)>,
}

impl BackendParams {
    /// Options as borrowed pairs, the shape backend crates take
    pub fn option_pairs(&self) -> Vec<(&str, &str)> {
        self.options
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a backend string (`name` or `name:key=value,flag,...`)
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    if name.is_empty() {
        return Err("Empty backend name".into());
    }

    let mut options = Vec::new();
    for opt in opts_str.split(',').filter(|o| !o.is_empty()) {
        let (key, value) = opt.split_once('=').unwrap_or((opt, ""));
        if key.is_empty() {
            return Err(format!("Invalid backend option: '{}'", opt).into());
        }
        options.push((key.to_string(), value.to_string()));
    }

    Ok(BackendParams {
        name: name.to_string(),
        options,
    })
}

/// Metadata backend selected on the command line
pub enum Backend {
    /// Linux MTD subsystem
    #[cfg(feature = "linux")]
    Linux(rmtd_linux::LinuxMtd),
    /// In-memory emulator
    #[cfg(feature = "dummy")]
    Dummy(rmtd_dummy::DummySubsystem),
}

macro_rules! dispatch {
    ($self:expr, $b:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "linux")]
            Backend::Linux($b) => $body,
            #[cfg(feature = "dummy")]
            Backend::Dummy($b) => $body,
        }
    };
}

impl MetadataBackend for Backend {
    fn probe(&self) -> BackendResult<Option<Interface>> {
        dispatch!(self, b => b.probe())
    }

    fn device_numbers(&self) -> BackendResult<Vec<u32>> {
        dispatch!(self, b => b.device_numbers())
    }

    fn node_id(&self, node: &str) -> BackendResult<NodeId> {
        dispatch!(self, b => b.node_id(node))
    }

    fn device_node_id(&self, dev_num: u32) -> BackendResult<NodeId> {
        dispatch!(self, b => b.device_node_id(dev_num))
    }

    fn attributes(&self, dev_num: u32) -> BackendResult<RawAttributes> {
        dispatch!(self, b => b.attributes(dev_num))
    }
}

/// Open data handle on one device
pub enum DataHandle {
    /// `/dev/mtdN` character device
    #[cfg(feature = "linux")]
    Linux(rmtd_linux::MtdNode),
    /// Emulated device
    #[cfg(feature = "dummy")]
    Dummy(rmtd_dummy::DummyFlash),
}

macro_rules! dispatch_data {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "linux")]
            DataHandle::Linux($d) => $body,
            #[cfg(feature = "dummy")]
            DataHandle::Dummy($d) => $body,
        }
    };
}

impl DataBackend for DataHandle {
    fn erase(&mut self, offset: u64, len: u32) -> Result<(), i32> {
        dispatch_data!(self, d => d.erase(offset, len))
    }

    fn is_bad(&mut self, offset: u64) -> Result<bool, i32> {
        dispatch_data!(self, d => d.is_bad(offset))
    }

    fn mark_bad(&mut self, offset: u64) -> Result<(), i32> {
        dispatch_data!(self, d => d.mark_bad(offset))
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, i32> {
        dispatch_data!(self, d => d.read_at(offset, buf))
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize, i32> {
        dispatch_data!(self, d => d.write_at(offset, data))
    }

    fn universal_bad_block_query(&self) -> bool {
        dispatch_data!(self, d => d.universal_bad_block_query())
    }
}

/// Open a session on the backend named by `backend`
pub fn open_session(backend: &str) -> Result<Session<Backend>, Box<dyn std::error::Error>> {
    let params = parse_backend_params(backend)?;
    let name = find_backend(&params.name).ok_or_else(|| {
        format!(
            "Unknown backend '{}' [available: {}]",
            params.name,
            backend_names_short()
        )
    })?;

    #[allow(unused_variables)]
    let options = params.option_pairs();

    let backend = match name {
        #[cfg(feature = "linux")]
        "linux" => Backend::Linux(rmtd_linux::LinuxMtd::new(rmtd_linux::parse_options(
            &options,
        )?)),
        #[cfg(feature = "dummy")]
        "dummy" => Backend::Dummy(rmtd_dummy::DummySubsystem::new(
            rmtd_dummy::parse_options(&options)?,
        )),
        _ => return Err(format!("Backend '{}' is not available", name).into()),
    };

    let session = Session::open(backend)?;
    log::info!(
        "Opened {} backend ({:?} interface)",
        name,
        session.interface()
    );
    Ok(session)
}

/// Open the data node belonging to `geometry`
///
/// `write` selects a read-write handle; read-only handles are enough for
/// reads and bad-block queries.
pub fn open_data(
    backend: &Backend,
    geometry: &DeviceGeometry,
    write: bool,
) -> Result<DataHandle, Box<dyn std::error::Error>> {
    match backend {
        #[cfg(feature = "linux")]
        Backend::Linux(mtd) => {
            let node = rmtd_linux::MtdNode::open(mtd.node_path(geometry.dev_num), write)?;
            Ok(DataHandle::Linux(node))
        }
        #[cfg(feature = "dummy")]
        Backend::Dummy(subsystem) => subsystem
            .open_device(geometry.dev_num, write)
            .map(DataHandle::Dummy)
            .ok_or_else(|| format!("mtd{} disappeared", geometry.dev_num).into()),
    }
}

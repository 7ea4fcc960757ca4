//! CLI argument parsing

use crate::backends;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use, with optional ':key=value,...' options [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "rmtd")]
#[command(author, version, about = "MTD flash device inspection and eraseblock I/O", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backend to use
    #[arg(short, long, global = true, default_value = backends::DEFAULT_BACKEND, help = backend_help())]
    pub backend: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared across commands
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// MTD device number
    #[arg(short = 'd', long = "devn", conflicts_with = "node", required_unless_present = "node")]
    pub dev_num: Option<u32>,

    /// MTD character device node (e.g. /dev/mtd0)
    pub node: Option<String>,
}

/// Eraseblock range shared by multi-block commands
#[derive(Args, Debug, Clone)]
pub struct BlockRange {
    /// First eraseblock (hex or decimal)
    #[arg(short, long, value_parser = parse_hex_u32)]
    pub eb: u32,

    /// Count of eraseblocks
    #[arg(short = 'n', long, default_value = "1", value_parser = parse_hex_u32)]
    pub count: u32,

    /// Skip eraseblocks that are marked bad
    #[arg(long)]
    pub skip_bad: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show subsystem summary
    Info {
        /// Also print the geometry of every device
        #[arg(short, long)]
        all: bool,
    },

    /// Show the geometry of one device
    Dev {
        #[command(flatten)]
        device: DeviceArgs,

        /// Print the bad eraseblock map
        #[arg(long)]
        map: bool,
    },

    /// Check whether a node is an MTD character device
    Probe {
        /// Node path
        node: String,
    },

    /// Erase eraseblocks
    Erase {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        range: BlockRange,
    },

    /// Read eraseblock contents to a file
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        range: BlockRange,

        /// Offset inside the eraseblock (single eraseblock only)
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,

        /// Bytes to read (single eraseblock only, default: to its end)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a file to eraseblocks
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// First eraseblock (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        eb: u32,

        /// Offset inside the first eraseblock
        #[arg(long, default_value = "0", value_parser = parse_hex_u32)]
        offset: u32,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Erase each eraseblock before writing to it
        #[arg(long)]
        erase: bool,

        /// Pad the last chunk with 0xFF up to the minimum I/O unit
        #[arg(long)]
        pad: bool,

        /// Skip eraseblocks that are marked bad
        #[arg(long)]
        skip_bad: bool,
    },

    /// Check whether an eraseblock is bad
    IsBad {
        #[command(flatten)]
        device: DeviceArgs,

        /// Eraseblock (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        eb: u32,
    },

    /// Mark an eraseblock bad
    MarkBad {
        #[command(flatten)]
        device: DeviceArgs,

        /// Eraseblock (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        eb: u32,
    },
}

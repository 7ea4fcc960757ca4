//! rmtd - MTD flash device inspection and eraseblock I/O
//!
//! A command-line front end over `rmtd-core`: subsystem and device
//! information in the style of `mtdinfo`, plus eraseblock-scoped erase,
//! read, write and bad-block commands.
//!
//! # Architecture
//!
//! Every command opens a [`rmtd_core::Session`] on the selected backend:
//! - **linux** - the kernel MTD subsystem (sysfs, or `/proc/mtd` on old
//!   kernels) and the `/dev/mtdN` character devices
//! - **dummy** - an in-memory emulator, for trying commands without flash
//!   hardware
//!
//! Eraseblock commands resolve the device geometry once and then go through
//! the I/O engine, which validates every call before it reaches the device.

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::write::WriteOptions;
use std::process::ExitCode;

/// Exit status when `probe` finds something that is not an MTD node
const EXIT_NOT_A_DEVICE: u8 = 2;

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e.downcast_ref::<rmtd_core::Error>() {
                Some(rmtd_core::Error::NotADevice) => ExitCode::from(EXIT_NOT_A_DEVICE),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let session = backends::open_session(&cli.backend)?;

    match cli.command {
        Commands::Info { all } => commands::device::run_info(&session, all),
        Commands::Dev { device, map } => {
            let geometry = commands::resolve(&session, &device)?;
            commands::device::run_dev(&session, &geometry, map)
        }
        Commands::Probe { node } => commands::device::run_probe(&session, &node),
        Commands::Erase { device, range } => {
            let geometry = commands::resolve(&session, &device)?;
            commands::blocks::run_erase(&session, &geometry, &range)
        }
        Commands::Read {
            device,
            range,
            offset,
            length,
            output,
        } => {
            let geometry = commands::resolve(&session, &device)?;
            commands::read::run_read(&session, &geometry, &range, offset, length, &output)
        }
        Commands::Write {
            device,
            eb,
            offset,
            input,
            erase,
            pad,
            skip_bad,
        } => {
            let geometry = commands::resolve(&session, &device)?;
            let opts = WriteOptions {
                eb,
                offset,
                erase,
                pad,
                skip_bad,
            };
            commands::write::run_write(&session, &geometry, &input, &opts)
        }
        Commands::IsBad { device, eb } => {
            let geometry = commands::resolve(&session, &device)?;
            commands::blocks::run_is_bad(&session, &geometry, eb)
        }
        Commands::MarkBad { device, eb } => {
            let geometry = commands::resolve(&session, &device)?;
            commands::blocks::run_mark_bad(&session, &geometry, eb)
        }
    }
}

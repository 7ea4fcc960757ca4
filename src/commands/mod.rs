//! CLI command implementations
//!
//! ## Device commands
//!
//! `info`, `dev` and `probe` only touch metadata; `dev --map` additionally
//! opens the node read-only for bad-block queries.
//!
//! ## Eraseblock commands
//!
//! `erase`, `read`, `write`, `is-bad` and `mark-bad` resolve the geometry
//! once, open a data handle and go through the I/O engine for every
//! eraseblock, so all range and capability checks apply.

pub mod blocks;
pub mod device;
pub mod read;
pub mod write;

use crate::backends::Backend;
use crate::cli::DeviceArgs;
use indicatif::{ProgressBar, ProgressStyle};
use rmtd_core::{DeviceGeometry, Session};

/// Resolve the device selected by `-d N` or a node path
pub fn resolve(
    session: &Session<Backend>,
    device: &DeviceArgs,
) -> Result<DeviceGeometry, Box<dyn std::error::Error>> {
    let geometry = match (device.dev_num, device.node.as_deref()) {
        (Some(dev_num), _) => session.device_info_by_number(dev_num)?,
        (None, Some(node)) => session.device_info(node)?,
        (None, None) => return Err("No device given (use -d N or a node path)".into()),
    };
    log::debug!(
        "mtd{}: {} eraseblocks of {} bytes",
        geometry.dev_num,
        geometry.eb_cnt,
        geometry.eb_size
    );
    Ok(geometry)
}

/// Check that `count` eraseblocks from `eb` exist
pub fn check_block_range(
    geometry: &DeviceGeometry,
    eb: u32,
    count: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if count == 0 || eb.checked_add(count).map_or(true, |end| end > geometry.eb_cnt) {
        return Err(format!(
            "Eraseblocks {}..{} are outside mtd{} (0..{})",
            eb,
            u64::from(eb) + u64::from(count),
            geometry.dev_num,
            geometry.eb_cnt
        )
        .into());
    }
    Ok(())
}

/// Format a byte count the way mtdinfo does (`131072 bytes, 128.0 KiB`)
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{} bytes, {:.1} GiB", bytes, bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{} bytes, {:.1} MiB", bytes, bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} bytes, {:.1} KiB", bytes, bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Create a progress bar counting eraseblocks
fn create_block_progress(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} eraseblocks ({{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Create a progress bar counting bytes
fn create_byte_progress(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

//! Read command implementation

use super::{check_block_range, create_byte_progress};
use crate::backends::{open_data, Backend};
use crate::cli::BlockRange;
use rmtd_core::{engine, DeviceGeometry, Session};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Run the read command
///
/// A single eraseblock can be read partially with `offset`/`length`;
/// multi-block reads always cover whole eraseblocks. Bad eraseblocks
/// skipped with `--skip-bad` are left out of the output.
pub fn run_read(
    session: &Session<Backend>,
    geometry: &DeviceGeometry,
    range: &BlockRange,
    offset: u32,
    length: Option<u32>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    check_block_range(geometry, range.eb, range.count)?;
    if range.count > 1 && (offset != 0 || length.is_some()) {
        return Err("--offset and --length only apply to single-eraseblock reads".into());
    }

    let len = length.unwrap_or_else(|| geometry.eb_size.saturating_sub(offset));
    check_span(geometry, offset, len)?;

    let mut handle = open_data(session.backend(), geometry, false)?;
    let total = u64::from(len) * u64::from(range.count);
    let pb = create_byte_progress(total, "Reading")?;

    let mut data = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; len as usize];

    for eb in range.eb..range.eb + range.count {
        if range.skip_bad && engine::is_bad(geometry, &mut handle, eb)?.is_bad() {
            pb.println(format!("Skipping bad eraseblock {}", eb));
        } else {
            engine::read_into(geometry, &mut handle, eb, offset, &mut chunk)?;
            data.extend_from_slice(&chunk);
        }
        pb.inc(u64::from(len));
    }

    pb.finish_with_message("Read complete");

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Check that `len` bytes from `offset` lie inside one eraseblock
fn check_span(
    geometry: &DeviceGeometry,
    offset: u32,
    len: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if len == 0 || u64::from(offset) + u64::from(len) > u64::from(geometry.eb_size) {
        return Err(format!(
            "{} bytes at offset {} do not fit in a {}-byte eraseblock",
            len, offset, geometry.eb_size
        )
        .into());
    }
    Ok(())
}

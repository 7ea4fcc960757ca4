//! Write command implementation

use super::create_byte_progress;
use crate::backends::{open_data, Backend};
use rmtd_core::{engine, DeviceGeometry, Session};
use std::path::Path;

/// Options of the write command
pub struct WriteOptions {
    /// First eraseblock
    pub eb: u32,
    /// Offset inside the first eraseblock
    pub offset: u32,
    /// Erase each eraseblock before its first write
    pub erase: bool,
    /// Pad the final chunk to the minimum I/O unit
    pub pad: bool,
    /// Skip bad eraseblocks
    pub skip_bad: bool,
}

/// Run the write command
///
/// The input fills the first eraseblock from `offset` and continues at the
/// start of each following eraseblock until it is used up.
pub fn run_write(
    session: &Session<Backend>,
    geometry: &DeviceGeometry,
    input: &Path,
    opts: &WriteOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);
    if data.is_empty() {
        return Err("Input file is empty".into());
    }
    if opts.offset >= geometry.eb_size {
        return Err(format!(
            "Offset {} is outside the {}-byte eraseblock",
            opts.offset, geometry.eb_size
        )
        .into());
    }

    let mut handle = open_data(session.backend(), geometry, true)?;
    let pb = create_byte_progress(data.len() as u64, "Writing")?;

    let mut eb = opts.eb;
    let mut offset = opts.offset;
    let mut remaining = data.as_slice();

    while !remaining.is_empty() {
        if eb >= geometry.eb_cnt {
            pb.abandon();
            return Err(format!(
                "{} bytes do not fit on mtd{}",
                remaining.len(),
                geometry.dev_num
            )
            .into());
        }

        if opts.skip_bad && engine::is_bad(geometry, &mut handle, eb)?.is_bad() {
            pb.println(format!("Skipping bad eraseblock {}", eb));
            eb += 1;
            offset = 0;
            continue;
        }

        if opts.erase {
            engine::erase(geometry, &mut handle, eb)?;
        }

        let room = (geometry.eb_size - offset) as usize;
        let (chunk, rest) = remaining.split_at(remaining.len().min(room));

        if opts.pad && rest.is_empty() {
            let padded = pad_to_min_io(chunk, geometry.min_io_size, room);
            engine::write(geometry, &mut handle, eb, offset, &padded)?;
        } else {
            engine::write(geometry, &mut handle, eb, offset, chunk)?;
        }

        pb.inc(chunk.len() as u64);
        remaining = rest;
        eb += 1;
        offset = 0;
    }

    pb.finish_with_message("Write complete");
    println!(
        "Wrote {} bytes to mtd{} starting at eraseblock {}",
        data.len(),
        geometry.dev_num,
        opts.eb
    );
    Ok(())
}

/// Pad `chunk` with 0xFF up to a multiple of `min_io`, never beyond `room`
fn pad_to_min_io(chunk: &[u8], min_io: u32, room: usize) -> Vec<u8> {
    let min_io = min_io.max(1) as usize;
    let target = chunk.len().div_ceil(min_io) * min_io;
    let mut padded = chunk.to_vec();
    padded.resize(target.min(room).max(chunk.len()), 0xFF);
    padded
}

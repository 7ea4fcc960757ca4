//! Erase and bad-block commands

use super::{check_block_range, create_block_progress};
use crate::backends::{open_data, Backend};
use crate::cli::BlockRange;
use rmtd_core::{engine, DeviceGeometry, Session};

/// Erase a range of eraseblocks
pub fn run_erase(
    session: &Session<Backend>,
    geometry: &DeviceGeometry,
    range: &BlockRange,
) -> Result<(), Box<dyn std::error::Error>> {
    check_block_range(geometry, range.eb, range.count)?;
    let mut handle = open_data(session.backend(), geometry, true)?;

    let pb = create_block_progress(u64::from(range.count), "Erasing")?;
    let mut skipped = 0u32;

    for eb in range.eb..range.eb + range.count {
        if range.skip_bad && engine::is_bad(geometry, &mut handle, eb)?.is_bad() {
            pb.println(format!("Skipping bad eraseblock {}", eb));
            skipped += 1;
        } else {
            engine::erase(geometry, &mut handle, eb)?;
        }
        pb.inc(1);
    }

    pb.finish_with_message("Erase complete");
    println!(
        "Erased {} eraseblock(s) of mtd{} starting at {}{}",
        range.count - skipped,
        geometry.dev_num,
        range.eb,
        if skipped > 0 {
            format!(" ({} bad skipped)", skipped)
        } else {
            String::new()
        }
    );
    Ok(())
}

/// Query one eraseblock
pub fn run_is_bad(
    session: &Session<Backend>,
    geometry: &DeviceGeometry,
    eb: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut handle = open_data(session.backend(), geometry, false)?;
    let state = engine::is_bad(geometry, &mut handle, eb)?;
    println!(
        "Eraseblock {} of mtd{} is {}",
        eb,
        geometry.dev_num,
        if state.is_bad() { "bad" } else { "good" }
    );
    Ok(())
}

/// Mark one eraseblock bad
pub fn run_mark_bad(
    session: &Session<Backend>,
    geometry: &DeviceGeometry,
    eb: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut handle = open_data(session.backend(), geometry, true)?;
    engine::mark_bad(geometry, &mut handle, eb)?;
    log::info!("mtd{}: marked eraseblock {} bad", geometry.dev_num, eb);
    println!("Marked eraseblock {} of mtd{} bad", eb, geometry.dev_num);
    Ok(())
}

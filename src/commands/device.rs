//! Device information commands

use super::format_bytes;
use crate::backends::{open_data, Backend};
use rmtd_core::{engine, DeviceGeometry, Session};

/// Print the subsystem summary, and every device with `all`
pub fn run_info(session: &Session<Backend>, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let info = session.get_info()?;
    let devices = session.device_numbers()?;

    println!("Count of MTD devices:           {}", info.dev_count);
    if !devices.is_empty() {
        let names: Vec<String> = devices.iter().map(|n| format!("mtd{}", n)).collect();
        println!("Present MTD devices:            {}", names.join(", "));
    }
    println!(
        "Sysfs interface supported:      {}",
        if info.sysfs_supported { "yes" } else { "no" }
    );

    if all {
        for dev_num in devices {
            println!();
            // Devices may vanish between listing and lookup
            match session.device_info_by_number(dev_num) {
                Ok(geometry) => print_geometry(&geometry),
                Err(e) => log::warn!("mtd{}: {}", dev_num, e),
            }
        }
    }

    Ok(())
}

/// Print one device, optionally with its bad eraseblock map
pub fn run_dev(
    session: &Session<Backend>,
    geometry: &DeviceGeometry,
    map: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    print_geometry(geometry);

    if map {
        let mut handle = open_data(session.backend(), geometry, false)?;
        let mut bad = Vec::new();
        for eb in 0..geometry.eb_cnt {
            if engine::is_bad(geometry, &mut handle, eb)?.is_bad() {
                bad.push(eb.to_string());
            }
        }
        println!(
            "Bad eraseblocks:                {}",
            if bad.is_empty() {
                "none".to_string()
            } else {
                bad.join(", ")
            }
        );
    }

    Ok(())
}

/// Check whether `node` is an MTD character device
pub fn run_probe(session: &Session<Backend>, node: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dev_num = session.probe_node(node)?;
    println!("{}: MTD device {}", node, dev_num);
    Ok(())
}

fn print_geometry(geometry: &DeviceGeometry) {
    println!("mtd{}", geometry.dev_num);
    println!("Name:                           {}", geometry.name);
    println!("Type:                           {}", geometry.type_str);
    println!(
        "Eraseblock size:                {}",
        format_bytes(u64::from(geometry.eb_size))
    );
    println!(
        "Amount of eraseblocks:          {} ({})",
        geometry.eb_cnt,
        format_bytes(geometry.size)
    );
    println!("Minimum input/output unit size: {} bytes", geometry.min_io_size);
    println!("Sub-page size:                  {} bytes", geometry.subpage_size);
    if geometry.has_oob() {
        println!("OOB size:                       {} bytes", geometry.oob_size);
    }
    if geometry.region_cnt > 0 {
        println!("Additional erase regions:       {}", geometry.region_cnt);
    }
    println!(
        "Character device major/minor:   {}:{}",
        geometry.major, geometry.minor
    );
    println!("Bad blocks are allowed:         {}", geometry.bb_allowed);
    println!("Device is writable:             {}", geometry.writable);
    if !geometry.is_consistent() {
        log::warn!(
            "mtd{}: eraseblock layout does not fit the device size",
            geometry.dev_num
        );
    }
}

//! Layout commands

use fwprog_core::layout::{Layout, LayoutSource};
use fwprog_flash::FlashHandle;
use std::fs;
use std::path::Path;

/// Print the flash map found in an image file
pub fn cmd_show(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let layout = Layout::from_fmap(&data)?;
    print_layout(&layout);
    Ok(())
}

/// Print the flash map read out of the chip
pub fn cmd_chip(handle: &mut FlashHandle) -> Result<(), Box<dyn std::error::Error>> {
    let layout = handle.read_fmap()?;
    print_layout(&layout);
    Ok(())
}

/// One line per region, sorted the way the layout carries them
pub fn print_layout(layout: &Layout) {
    if let Some(name) = &layout.name {
        println!("Layout: {}", name);
    }
    println!(
        "Source: {}",
        match layout.source {
            LayoutSource::Fmap => "FMAP",
            LayoutSource::Manual => "manual",
        }
    );

    println!("\nRegions ({}):", layout.len());
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>4}",
        "Name", "Start", "End", "Size", "RO"
    );
    println!("{:-<60}", "");

    for region in &layout.regions {
        println!(
            "{:<20} {:#010X} {:#010X} {:>10} {:>4}",
            region.name,
            region.start,
            region.end(),
            super::format_size(region.size),
            if region.readonly { "yes" } else { "-" }
        );
    }
}

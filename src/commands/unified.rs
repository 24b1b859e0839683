//! Read, write, erase and verify against any flash device
//!
//! Every operation here takes `&mut dyn FlashDevice`, so the same code
//! serves chips probed over SPI and flash hidden behind an EC.

use fwprog_core::flash::{erase_and_write, FlashDevice, WriteStats};
use fwprog_core::layout::{Layout, LayoutSource, Region};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Transfer unit for reads and verifies
const CHUNK: usize = 4096;

fn announce_size(flash_size: u32) {
    println!(
        "Flash size: {} bytes ({})",
        flash_size,
        super::format_size(flash_size)
    );
}

fn slurp(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

fn byte_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
        phase
    );
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&template)?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

fn describe_regions(verb: &str, included: &[&Region]) {
    println!("{} {} region(s):", verb, included.len());
    for region in included {
        println!(
            "  {:<16} {:#010x}+{:#x}",
            region.name, region.start, region.size
        );
    }
}

/// A one-region layout spanning the whole chip, already selected
fn whole_chip(flash_size: u32) -> Layout {
    let mut layout = Layout::with_source(LayoutSource::Manual);
    let mut region = Region::new("full", 0, flash_size);
    region.included = true;
    layout.add_region(region);
    layout
}

fn report_write_stats(stats: &WriteStats) {
    if !stats.flash_modified {
        println!("Flash already holds the desired data, nothing written");
        return;
    }
    println!(
        "{} blocks erased ({} bytes), {} writes performed ({} bytes)",
        stats.erases_performed, stats.bytes_erased, stats.writes_performed, stats.bytes_written
    );
    if stats.passes > 1 {
        println!(
            "Some spans were denied on the first attempt; finished in {} passes",
            stats.passes
        );
    }
}

/// Read the whole chip into a file
pub fn run_read<D: FlashDevice + ?Sized>(
    device: &mut D,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = whole_chip(device.size());
    run_read_with_layout(device, output, &layout)
}

/// Read the selected layout regions into a full-size image file
///
/// Bytes outside the selected regions come out as 0xFF so the file
/// keeps chip-absolute offsets.
pub fn run_read_with_layout<D: FlashDevice + ?Sized>(
    device: &mut D,
    output: &Path,
    layout: &Layout,
) -> Result<(), Box<dyn std::error::Error>> {
    let flash_size = device.size();
    announce_size(flash_size);

    let included: Vec<_> = layout.included_regions().collect();
    if included.is_empty() {
        return Err("no regions selected; use --include to pick some".into());
    }
    describe_regions("Reading", &included);

    let total: usize = included.iter().map(|r| r.size as usize).sum();
    let mut image = vec![0xFFu8; flash_size as usize];
    let bar = byte_bar(total as u64, "Reading")?;

    let mut done = 0usize;
    for region in included {
        let mut offset = region.start;
        while offset < region.end() {
            let len = CHUNK.min((region.end() - offset) as usize);
            device.read(offset, &mut image[offset as usize..offset as usize + len])?;
            offset += len as u32;
            done += len;
            bar.set_position(done as u64);
        }
    }
    bar.finish_with_message("Read complete");

    let mut file = File::create(output)?;
    file.write_all(&image)?;
    println!("Wrote {} bytes to {:?}", image.len(), output);
    println!("  ({} bytes from selected regions, rest 0xFF)", done);

    Ok(())
}

/// Program a full image onto the chip
///
/// The device sees the image before any byte moves, so programmers
/// that execute out of the flash they serve can park themselves in a
/// copy the write will not touch.
pub fn run_write<D: FlashDevice + ?Sized>(
    device: &mut D,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let flash_size = device.size();
    announce_size(flash_size);

    let image = slurp(input)?;
    if image.len() != flash_size as usize {
        return Err(format!(
            "image is {} bytes but the flash holds {}",
            image.len(),
            flash_size
        )
        .into());
    }

    device.prepare_write(&image)?;

    let bar = spinner("Erasing and writing...")?;
    let result = erase_and_write(device, 0, &image);
    match &result {
        Ok(_) => bar.finish_with_message("Write complete"),
        Err(_) => bar.abandon_with_message("Write failed"),
    }
    let stats = result?;

    device.finish_write()?;

    report_write_stats(&stats);
    println!("Write complete ({} bytes verified)", image.len());

    Ok(())
}

/// Erase the whole chip
pub fn run_erase<D: FlashDevice + ?Sized>(
    device: &mut D,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = whole_chip(device.size());
    run_erase_with_layout(device, &layout)
}

/// Erase one explicit span
pub fn run_erase_range<D: FlashDevice + ?Sized>(
    device: &mut D,
    start: u32,
    length: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    announce_size(device.size());

    let granularity = device.min_erase_size();
    if start % granularity != 0 || length % granularity != 0 {
        return Err(format!("erase span must sit on {} byte blocks", granularity).into());
    }

    let bar = spinner(&format!("Erasing {:#010x}+{:#x}...", start, length))?;
    device.erase(start, length)?;
    bar.finish_with_message("Erase complete");
    Ok(())
}

/// Erase the selected layout regions
pub fn run_erase_with_layout<D: FlashDevice + ?Sized>(
    device: &mut D,
    layout: &Layout,
) -> Result<(), Box<dyn std::error::Error>> {
    announce_size(device.size());

    let included: Vec<_> = layout.included_regions().collect();
    if included.is_empty() {
        return Err("no regions selected; use --include to pick some".into());
    }
    describe_regions("Erasing", &included);

    let granularity = device.min_erase_size();
    if let Some(region) = included.iter().find(|r| !r.is_aligned(granularity)) {
        return Err(format!(
            "region '{}' does not sit on {} byte erase blocks",
            region.name, granularity
        )
        .into());
    }

    let bar = spinner("")?;
    for region in included {
        bar.set_message(format!("Erasing {}...", region.name));
        device.erase(region.start, region.size)?;
    }
    bar.finish_with_message("Erase complete");

    Ok(())
}

/// Compare the chip against expected data, reporting the first mismatch
pub fn verify_flash<D: FlashDevice + ?Sized>(
    device: &mut D,
    expected: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = vec![0u8; CHUNK];
    let bar = byte_bar(expected.len() as u64, "Verifying")?;

    let mut offset = 0usize;
    while offset < expected.len() {
        let len = CHUNK.min(expected.len() - offset);
        let chunk = &mut buf[..len];
        device.read(offset as u32, chunk)?;

        let want = &expected[offset..offset + len];
        if let Some(i) = chunk.iter().zip(want).position(|(a, b)| a != b) {
            bar.abandon_with_message("Verification failed");
            return Err(format!(
                "mismatch at {:#010x}: expected 0x{:02X}, found 0x{:02X}",
                offset + i,
                want[i],
                chunk[i]
            )
            .into());
        }

        offset += len;
        bar.set_position(offset as u64);
    }

    bar.finish_with_message("Verification passed");
    Ok(())
}

/// Verify the chip against an image file
pub fn run_verify<D: FlashDevice + ?Sized>(
    device: &mut D,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let flash_size = device.size();
    announce_size(flash_size);

    let expected = slurp(input)?;
    if expected.len() > flash_size as usize {
        return Err(format!(
            "image is {} bytes but the flash holds only {}",
            expected.len(),
            flash_size
        )
        .into());
    }

    verify_flash(device, &expected)?;
    println!("Verification passed");

    Ok(())
}

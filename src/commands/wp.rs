//! Write protection commands

use fwprog_core::layout::Layout;
use fwprog_core::wp::{WpMode, WpRange, WriteOptions};
use fwprog_flash::FlashHandle;
use std::error::Error;

/// Fractions chips commonly express, with the labels people expect
const FRACTIONS: &[(f64, &str)] = &[
    (0.03125, "1/32"),
    (0.0625, "1/16"),
    (0.125, "1/8"),
    (0.25, "1/4"),
    (0.5, "1/2"),
    (0.75, "3/4"),
    (0.875, "7/8"),
];

/// Describe a range as a position plus fraction of the chip
fn format_range(range: &WpRange, total_size: u32) -> String {
    if range.len == 0 {
        return "none".to_string();
    }
    if range.len == total_size {
        return "all".to_string();
    }

    let fraction = range.len as f64 / total_size as f64;
    let fraction_str = FRACTIONS
        .iter()
        .find(|(f, _)| (fraction - f).abs() < 0.001)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("{:.1}%", fraction * 100.0));

    let position = if range.start == 0 {
        "lower"
    } else if range.start + range.len == total_size {
        "upper"
    } else {
        "middle"
    };

    format!("{} {}", position, fraction_str)
}

fn format_mode(mode: WpMode) -> &'static str {
    match mode {
        WpMode::Disabled => "disabled",
        WpMode::Hardware => "hardware",
        WpMode::PowerCycle => "power_cycle",
        WpMode::Permanent => "permanent",
    }
}

/// Parse "start,length", each part hex or decimal
fn parse_range(spec: &str) -> Result<WpRange, Box<dyn Error>> {
    let (start, len) = spec
        .split_once(',')
        .ok_or_else(|| format!("bad range '{}', expected start,length", spec))?;
    Ok(WpRange::new(parse_number(start)?, parse_number(len)?))
}

fn parse_number(s: &str) -> Result<u32, Box<dyn Error>> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("bad hex number '{}': {}", s, e).into())
    } else {
        s.parse::<u32>()
            .map_err(|e| format!("bad number '{}': {}", s, e).into())
    }
}

fn require_wp_support(handle: &FlashHandle) -> Result<(), Box<dyn Error>> {
    if !handle.wp_supported() {
        return Err("this chip offers no write protection control".into());
    }
    Ok(())
}

fn options_for(temporary: bool) -> WriteOptions {
    WriteOptions {
        volatile: temporary,
    }
}

fn temporary_suffix(temporary: bool) -> &'static str {
    if temporary {
        " (temporary)"
    } else {
        ""
    }
}

/// Print the current protection mode and range
pub fn cmd_status(handle: &mut FlashHandle) -> Result<(), Box<dyn Error>> {
    require_wp_support(handle)?;

    let config = handle
        .read_wp_config()
        .map_err(|e| format!("cannot read protection state: {}", e))?;
    let total_size = handle.size();

    println!(
        "Protection range: start=0x{:08x} length=0x{:08x} ({})",
        config.range.start,
        config.range.len,
        format_range(&config.range, total_size)
    );
    println!("Protection mode: {}", format_mode(config.mode));

    Ok(())
}

/// Print every range the chip can protect
pub fn cmd_list(handle: &mut FlashHandle) -> Result<(), Box<dyn Error>> {
    require_wp_support(handle)?;

    let ranges = handle
        .list_wp_ranges()
        .map_err(|e| format!("cannot list protection ranges: {}", e))?;
    let total_size = handle.size();

    if ranges.is_empty() {
        println!("No protection ranges available.");
        return Ok(());
    }

    println!("Available protection ranges:");
    for range in &ranges {
        println!(
            "    start=0x{:08x} length=0x{:08x} ({})",
            range.start,
            range.len,
            format_range(range, total_size)
        );
    }

    Ok(())
}

/// Switch protection on in the given mode, keeping the range
pub fn cmd_enable(
    handle: &mut FlashHandle,
    mode: WpMode,
    temporary: bool,
) -> Result<(), Box<dyn Error>> {
    require_wp_support(handle)?;

    handle
        .set_wp_mode(mode, options_for(temporary))
        .map_err(|e| format!("cannot enable write protection: {}", e))?;

    println!(
        "Write protection enabled in {} mode{}.",
        format_mode(mode),
        temporary_suffix(temporary)
    );
    Ok(())
}

/// Switch protection off
pub fn cmd_disable(handle: &mut FlashHandle, temporary: bool) -> Result<(), Box<dyn Error>> {
    require_wp_support(handle)?;

    handle
        .disable_wp(options_for(temporary))
        .map_err(|e| format!("cannot disable write protection: {}", e))?;

    println!("Write protection disabled{}.", temporary_suffix(temporary));
    Ok(())
}

/// Set the protected range from a "start,length" specification
pub fn cmd_range(
    handle: &mut FlashHandle,
    range_spec: &str,
    temporary: bool,
) -> Result<(), Box<dyn Error>> {
    require_wp_support(handle)?;

    let range = parse_range(range_spec)?;
    let total_size = handle.size();

    if range.start as u64 + range.len as u64 > total_size as u64 {
        return Err(format!(
            "range 0x{:x},0x{:x} runs past the end of the chip (0x{:x} bytes)",
            range.start, range.len, total_size
        )
        .into());
    }

    handle
        .set_wp_range(&range, options_for(temporary))
        .map_err(|e| format!("cannot set protection range: {}", e))?;

    println!(
        "Protection range set to start=0x{:08x} length=0x{:08x} ({}){}.",
        range.start,
        range.len,
        format_range(&range, total_size),
        temporary_suffix(temporary)
    );
    Ok(())
}

/// Protect the span covered by a named layout region
pub fn cmd_region(
    handle: &mut FlashHandle,
    layout: &Layout,
    region_name: &str,
    temporary: bool,
) -> Result<(), Box<dyn Error>> {
    require_wp_support(handle)?;

    let region = layout
        .find_region(region_name)
        .ok_or_else(|| format!("layout has no region named '{}'", region_name))?;

    let range = WpRange::new(region.start, region.size);
    let total_size = handle.size();

    handle
        .set_wp_range(&range, options_for(temporary))
        .map_err(|e| format!("cannot protect region '{}': {}", region_name, e))?;

    println!(
        "Protection set for region '{}': start=0x{:08x} length=0x{:08x} ({}){}.",
        region_name,
        range.start,
        range.len,
        format_range(&range, total_size),
        temporary_suffix(temporary)
    );
    Ok(())
}

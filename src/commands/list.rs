//! Listing the programmers and chips this build knows

use fwprog_core::chip;

/// Print every programmer compiled into this binary
pub fn list_programmers() {
    let programmers = fwprog_flash::available_programmers();
    if programmers.is_empty() {
        println!("No programmers enabled. Recompile with the programmer features.");
        return;
    }

    println!("Supported programmers:");
    println!();
    for info in programmers {
        if info.aliases.is_empty() {
            println!("  {:<10} - {}", info.name, info.description);
        } else {
            println!(
                "  {:<10} - {} (aliases: {})",
                info.name,
                info.description,
                info.aliases.join(", ")
            );
        }
    }
}

/// Print the chip database, optionally narrowed to one vendor
pub fn list_chips(vendor_filter: Option<&str>) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<12} {:<20} {:>10} {:>10}",
        "Vendor", "Name", "Size", "JEDEC ID"
    );
    println!("{:-<60}", "");

    for chip in chip::CHIPS {
        if let Some(vendor) = vendor_filter {
            if !chip.vendor.to_lowercase().contains(&vendor.to_lowercase()) {
                continue;
            }
        }

        println!(
            "{:<12} {:<20} {:>10} {:>10}",
            chip.vendor,
            chip.name,
            super::format_size(chip.total_size),
            format!("{:02X} {:04X}", chip.manufacturer_id, chip.model_id)
        );
    }
}

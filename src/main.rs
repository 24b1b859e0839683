//! fwprog, a firmware flash programmer
//!
//! Reads, writes, erases and write-protects the NOR flash parts found
//! on firmware boards. Command code targets one device abstraction, so
//! a chip probed over raw SPI and flash mediated by an EC take the
//! same code paths.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, LayoutArgs, LayoutCommands, ListCommands, WpCommands, WpModeArg};
use fwprog_flash::{open_flash, FlashHandle, WpMode};

use fwprog_core::layout::Layout;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Verbosity maps onto the log filter unless RUST_LOG overrides it
    let default_filter = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Probe { programmer } => {
            let handle = open_flash(&programmer)?;
            match handle.chip_info() {
                Some(info) => println!(
                    "Found {} {} ({} bytes)",
                    info.vendor, info.name, info.total_size
                ),
                None => println!(
                    "Opened opaque programmer ({} bytes of flash)",
                    handle.size()
                ),
            }
            Ok(())
        }
        Commands::Read {
            programmer,
            output,
            layout,
        } => {
            let mut handle = open_flash(&programmer)?;
            if layout.wants_layout() {
                let mut regions = load_layout(&mut handle, &layout)?;
                apply_region_filters(&mut regions, &layout)?;
                commands::unified::run_read_with_layout(handle.as_device_mut(), &output, &regions)
            } else {
                commands::unified::run_read(handle.as_device_mut(), &output)
            }
        }
        Commands::Write { programmer, input } => {
            let mut handle = open_flash(&programmer)?;
            commands::unified::run_write(handle.as_device_mut(), &input)
        }
        Commands::Erase {
            programmer,
            start,
            length,
            layout,
        } => {
            let mut handle = open_flash(&programmer)?;
            match (start, length) {
                (Some(start), Some(length)) => {
                    commands::unified::run_erase_range(handle.as_device_mut(), start, length)
                }
                (Some(_), None) | (None, Some(_)) => {
                    Err("--start and --length must be given together".into())
                }
                (None, None) if layout.wants_layout() => {
                    let mut regions = load_layout(&mut handle, &layout)?;
                    apply_region_filters(&mut regions, &layout)?;
                    commands::unified::run_erase_with_layout(handle.as_device_mut(), &regions)
                }
                (None, None) => commands::unified::run_erase(handle.as_device_mut()),
            }
        }
        Commands::Verify { programmer, input } => {
            let mut handle = open_flash(&programmer)?;
            commands::unified::run_verify(handle.as_device_mut(), &input)
        }
        Commands::Info { programmer } => {
            let mut handle = open_flash(&programmer)?;
            print_chip_info(&mut handle);
            Ok(())
        }
        Commands::List(subcmd) => {
            match subcmd {
                ListCommands::Programmers => commands::list_programmers(),
                ListCommands::Chips { vendor } => commands::list_chips(vendor.as_deref()),
            }
            Ok(())
        }
        Commands::Layout(subcmd) => match subcmd {
            LayoutCommands::Show { input } => commands::layout::cmd_show(&input),
            LayoutCommands::Chip { programmer } => {
                let mut handle = open_flash(&programmer)?;
                commands::layout::cmd_chip(&mut handle)
            }
        },
        Commands::Wp(subcmd) => match subcmd {
            WpCommands::Status { programmer } => {
                let mut handle = open_flash(&programmer)?;
                commands::wp::cmd_status(&mut handle)
            }
            WpCommands::List { programmer } => {
                let mut handle = open_flash(&programmer)?;
                commands::wp::cmd_list(&mut handle)
            }
            WpCommands::Enable {
                programmer,
                mode,
                temporary,
            } => {
                let mut handle = open_flash(&programmer)?;
                let mode = match mode {
                    WpModeArg::Hardware => WpMode::Hardware,
                    WpModeArg::PowerCycle => WpMode::PowerCycle,
                    WpModeArg::Permanent => WpMode::Permanent,
                };
                commands::wp::cmd_enable(&mut handle, mode, temporary)
            }
            WpCommands::Disable {
                programmer,
                temporary,
            } => {
                let mut handle = open_flash(&programmer)?;
                commands::wp::cmd_disable(&mut handle, temporary)
            }
            WpCommands::Range {
                programmer,
                range,
                temporary,
            } => {
                let mut handle = open_flash(&programmer)?;
                commands::wp::cmd_range(&mut handle, &range, temporary)
            }
            WpCommands::Region {
                programmer,
                region_name,
                layout,
                temporary,
            } => {
                let mut handle = open_flash(&programmer)?;
                let regions = load_layout(&mut handle, &layout)?;
                commands::wp::cmd_region(&mut handle, &regions, &region_name, temporary)
            }
        },
    }
}

/// Pull the layout from whichever source the arguments name
fn load_layout(
    handle: &mut FlashHandle,
    args: &LayoutArgs,
) -> Result<Layout, Box<dyn std::error::Error>> {
    if let Some(path) = &args.fmap_file {
        let layout = Layout::from_fmap_file(path)?;
        log::info!("loaded flash map from {:?}", path);
        Ok(layout)
    } else if args.fmap {
        // The FMAP can sit anywhere in the array, so the whole chip is read
        let layout = handle.read_fmap()?;
        log::info!("flash map on chip holds {} regions", layout.len());
        commands::layout::print_layout(&layout);
        Ok(layout)
    } else if args.has_region_filter() {
        Err("--include, --exclude and --region need a layout source (--fmap or --fmap-file)".into())
    } else {
        Err("no layout source specified".into())
    }
}

/// Apply --region, --include and --exclude to a loaded layout
fn apply_region_filters(
    layout: &mut Layout,
    args: &LayoutArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    // --region is shorthand for --include with one region
    if let Some(region_name) = &args.region {
        layout.include_region(region_name)?;
    }
    for name in &args.include {
        layout.include_region(name)?;
    }
    for name in &args.exclude {
        layout.exclude_region(name)?;
    }
    // Nothing named means everything selected
    if !layout.has_included_regions() {
        layout.include_all();
    }
    Ok(())
}

fn print_chip_info(handle: &mut FlashHandle) {
    if let Some(info) = handle.chip_info().copied() {
        println!("Flash Chip Information");
        println!("======================");
        println!();
        println!("Vendor:          {}", info.vendor);
        println!("Name:            {}", info.name);
        println!(
            "JEDEC ID:        {:02X} {:04X}",
            info.manufacturer_id, info.model_id
        );
        println!(
            "Size:            {} bytes ({})",
            info.total_size,
            commands::format_size(info.total_size)
        );
        println!("Page size:       {} bytes", info.page_size);

        if let Some(chip) = info.chip {
            println!();
            println!("Erase blocks:");
            for eb in chip.erase_blocks {
                println!(
                    "  Opcode 0x{:02X}: {}",
                    eb.opcode,
                    commands::format_size(eb.size)
                );
            }
            println!();
            println!("Features:        {:?}", chip.features);
            match chip.wp_family {
                Some(family) => println!("WP scheme:       {:?}", family),
                None => println!("WP scheme:       not known"),
            }
        }
    } else {
        // Opaque programmer; only the geometry is known
        let flash_size = handle.size();

        println!("Flash Information (Opaque Programmer)");
        println!("=====================================");
        println!();
        println!(
            "Size: {} bytes ({})",
            flash_size,
            commands::format_size(flash_size)
        );
        println!();

        match handle.read_fmap() {
            Ok(layout) => {
                println!("Flash map regions:");
                for region in &layout.regions {
                    println!(
                        "  {:<16} {:#010x}+{:#x} ({})",
                        region.name,
                        region.start,
                        region.size,
                        commands::format_size(region.size)
                    );
                }
            }
            Err(_) => println!("Note: no flash map found."),
        }
    }
}

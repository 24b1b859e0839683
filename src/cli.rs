//! Argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Accept "0x1000" and "4096" alike
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("bad hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("bad number: {}", e))
    }
}

/// Help text for --programmer listing what this build supports
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        fwprog_flash::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "fwprog")]
#[command(author, version, about = "Firmware flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Layout source and region selection, shared across commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LayoutArgs {
    /// Read the layout from the flash map embedded in the chip
    #[arg(long)]
    pub fmap: bool,

    /// Read the layout from the flash map in an image file
    #[arg(long, value_name = "FILE")]
    pub fmap_file: Option<PathBuf>,

    /// Include only these regions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Exclude these regions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Operate on a single region (shorthand for --include with one region)
    #[arg(long)]
    pub region: Option<String>,
}

impl LayoutArgs {
    /// Whether a layout source was named
    pub fn has_layout_source(&self) -> bool {
        self.fmap || self.fmap_file.is_some()
    }

    /// Whether any region selection was given
    pub fn has_region_filter(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty() || self.region.is_some()
    }

    /// Whether the operation should go through a layout at all
    pub fn wants_layout(&self) -> bool {
        self.has_layout_source() || self.has_region_filter()
    }
}

/// Protection mode for `wp enable`
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum WpModeArg {
    /// Protection follows the hardware WP pin
    Hardware,
    /// Protection sticks until the next power cycle
    PowerCycle,
    /// Protection can never be disabled again
    Permanent,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe for a flash chip
    Probe {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Read flash contents into a file
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Write an image file to flash
    Write {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Input file path (must match the flash size)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Erase flash
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Start address for a partial erase (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Length of the span to erase (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Compare flash contents against a file
    Verify {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Input file path to compare against
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show chip information
    Info {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// List supported programmers and chips
    #[command(subcommand)]
    List(ListCommands),

    /// Layout operations
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// Write protection operations
    #[command(subcommand)]
    Wp(WpCommands),
}

/// Listing subcommands
#[derive(Subcommand)]
pub enum ListCommands {
    /// List supported programmers
    Programmers,

    /// List supported chips
    Chips {
        /// Only chips from this vendor
        #[arg(long)]
        vendor: Option<String>,
    },
}

/// Layout subcommands
#[derive(Subcommand)]
pub enum LayoutCommands {
    /// Show the flash map found in an image file
    Show {
        /// Flash image to scan
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the flash map read from the chip
    Chip {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },
}

/// Write protection subcommands
#[derive(Subcommand)]
pub enum WpCommands {
    /// Show the current protection mode and range
    Status {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// List every protection range the chip can express
    List {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Enable write protection, keeping the current range
    Enable {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Protection mode
        #[arg(long, value_enum, default_value = "hardware")]
        mode: WpModeArg,

        /// Use volatile status registers (lost at power-off)
        #[arg(long)]
        temporary: bool,
    },

    /// Disable write protection
    Disable {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Use volatile status registers (lost at power-off)
        #[arg(long)]
        temporary: bool,
    },

    /// Set the protected range, keeping the current mode
    Range {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Range to protect as "start,length" (hex or decimal)
        range: String,

        /// Use volatile status registers (lost at power-off)
        #[arg(long)]
        temporary: bool,
    },

    /// Protect the span covered by a named layout region
    Region {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Region name from the layout
        region_name: String,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Use volatile status registers (lost at power-off)
        #[arg(long)]
        temporary: bool,
    },
}

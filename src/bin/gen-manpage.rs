//! Renders the fwprog man pages
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(cmd: clap::Command, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    fs::write(path, buffer)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let root = cli::Cli::command();

    // One page per subcommand alongside the main one
    for sub in root.get_subcommands() {
        let name = format!("fwprog-{}", sub.get_name());
        let page = output_dir.join(format!("{}.1", name));
        render(sub.clone().name(name), &page)?;
    }

    let main_page = output_dir.join("fwprog.1");
    render(root, &main_page)?;

    println!("Man pages written to {}", output_dir.display());
    println!("View with: man -l {}", main_page.display());

    Ok(())
}

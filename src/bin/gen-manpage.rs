//! Man page generator for spibus
//!
//! Writes `spibus.1` plus one `spibus-<command>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::io;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

/// Render every page as (file name, roff source)
fn render_pages() -> io::Result<Vec<(String, Vec<u8>)>> {
    let cmd = cli::Cli::command();
    let mut pages = Vec::new();

    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut buffer)?;
    pages.push(("spibus.1".to_string(), buffer));

    for sub in cmd.get_subcommands() {
        let title = format!("spibus-{}", sub.get_name());
        let mut buffer = Vec::new();
        clap_mangen::Man::new(sub.clone())
            .title(title.clone())
            .render(&mut buffer)?;
        pages.push((format!("{}.1", title), buffer));
    }

    Ok(pages)
}

fn main() -> io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    for (name, page) in render_pages()? {
        let path = output_dir.join(&name);
        fs::write(&path, page)?;
        println!("Generated {}", path.display());
    }

    println!("\nView with: man -l {}", output_dir.join("spibus.1").display());
    Ok(())
}

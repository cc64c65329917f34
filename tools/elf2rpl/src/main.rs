//! Converts a statically linked 32-bit big-endian PowerPC ELF executable
//! into the RPX container format consumed by the target platform's loader.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use elf2rpl::{passes, verbose};
use rpl_elf::ElfFile;

/// ELF to RPX converter.
#[derive(Parser)]
#[command(name = "elf2rpl", version, about)]
struct Cli {
    /// Source ELF path.
    source: PathBuf,

    /// Destination RPX path.
    dest: PathBuf,

    /// Suppress per-pass output; show only errors.
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    quiet: bool,

    /// Enable verbose output with per-section diagnostics.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    verbose::init(cli.quiet, cli.verbose);

    let data = std::fs::read(&cli.source)
        .with_context(|| format!("reading {}", cli.source.display()))?;
    let mut elf = ElfFile::parse(&data)
        .map_err(|e| anyhow!("parsing {}: {e}", cli.source.display()))?;

    passes::run_pipeline(&mut elf)?;

    std::fs::write(&cli.dest, elf.to_bytes())
        .with_context(|| format!("writing {}", cli.dest.display()))?;

    if !verbose::is_quiet() {
        println!("Wrote {}", cli.dest.display());
    }
    Ok(())
}

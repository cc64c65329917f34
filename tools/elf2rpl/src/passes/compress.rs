//! Section payload deflation.
//!
//! Large payloads are replaced by a 4-byte big-endian inflated-size
//! prefix followed by a zlib deflate stream, and the section gains the
//! deflated flag. The CRC table and file info stay uncompressed so the
//! loader can read them before setting up inflation, and CRCs keep
//! covering the inflated bytes because this pass runs after CRC
//! generation.

use std::io::Write;

use anyhow::{Context, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rpl_elf::section::{SHF_DEFLATED, SHT_RPL_CRCS, SHT_RPL_FILEINFO};
use rpl_elf::ElfFile;

use crate::verbose::vprintln;

/// Payloads below this size are stored uncompressed.
const DEFLATE_MIN_SECTION_SIZE: usize = 0x18;

/// Deflate level used for section payloads.
const DEFLATE_LEVEL: u32 = 6;

/// Deflates every eligible section payload in place.
pub fn deflate_sections(file: &mut ElfFile) -> Result<()> {
    for section in &mut file.sections {
        if section.data.len() < DEFLATE_MIN_SECTION_SIZE
            || section.header.sh_type == SHT_RPL_CRCS
            || section.header.sh_type == SHT_RPL_FILEINFO
        {
            continue;
        }

        let inflated_size = section.data.len();
        let mut out = Vec::with_capacity(4 + inflated_size / 2);
        out.extend_from_slice(&(inflated_size as u32).to_be_bytes());

        let mut encoder = ZlibEncoder::new(out, Compression::new(DEFLATE_LEVEL));
        encoder
            .write_all(&section.data)
            .with_context(|| format!("deflating section {}", section.name))?;
        section.data = encoder
            .finish()
            .with_context(|| format!("deflating section {}", section.name))?;
        section.header.sh_flags |= SHF_DEFLATED;

        vprintln!(
            "    {}: {} -> {} bytes",
            section.name,
            inflated_size,
            section.data.len()
        );
    }
    Ok(())
}

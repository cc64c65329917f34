//! The RPX transformation pipeline.
//!
//! Each pass mutates the in-memory [`ElfFile`] in place and fails the
//! whole conversion on error. Pass order is load-bearing: alignments
//! must be final before loader addresses are assigned, relocation fix-up
//! must precede address assignment so new relocations track moved
//! sections, file info precedes CRC generation (the CRC table covers it),
//! CRC generation precedes deflation (CRCs cover inflated bytes), the
//! header fix precedes offset layout, and offset layout runs last.

pub mod bss;
pub mod compress;
pub mod layout;
pub mod metadata;
pub mod relocations;
pub mod reorder;

use anyhow::{Context, Result};
use rpl_elf::ElfFile;

use crate::verbose::dprintln;

type Pass = fn(&mut ElfFile) -> Result<()>;

/// The pipeline in execution order.
const PASSES: &[(&str, Pass)] = &[
    ("fix-bss", bss::fix_bss_nobits),
    ("reorder-sections", reorder::reorder_section_index),
    ("fix-relocations", relocations::fix_relocations),
    ("fix-alignment", layout::fix_section_align),
    ("assign-loader-addresses", layout::fix_loader_virtual_addresses),
    ("generate-fileinfo", metadata::generate_file_info_section),
    ("generate-crcs", metadata::generate_crc_section),
    ("fix-header", metadata::fix_file_header),
    ("deflate-sections", compress::deflate_sections),
    ("layout-offsets", layout::calculate_section_offsets),
];

/// Runs every pass in order, stopping at the first failure.
pub fn run_pipeline(file: &mut ElfFile) -> Result<()> {
    for (name, pass) in PASSES {
        dprintln!("  {name}");
        pass(file).with_context(|| format!("{name} pass failed"))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use rpl_elf::section::{SHT_RELA, SHT_SYMTAB};
    use rpl_elf::{ElfFile, Header, Rela, Section, SectionHeader, Symbol};

    /// Build a section whose `sh_size` matches its payload.
    pub(crate) fn section(name: &str, sh_type: u32, sh_flags: u32, data: Vec<u8>) -> Section {
        Section {
            header: SectionHeader {
                sh_type,
                sh_flags,
                sh_size: data.len() as u32,
                ..SectionHeader::default()
            },
            name: name.into(),
            data,
        }
    }

    /// Encode symbols into a SYMTAB section linked to `link`.
    pub(crate) fn symtab(name: &str, symbols: &[Symbol], link: u32) -> Section {
        let mut data = vec![0u8; symbols.len() * Symbol::SIZE];
        for (i, sym) in symbols.iter().enumerate() {
            sym.store(&mut data, i * Symbol::SIZE);
        }
        let mut s = section(name, SHT_SYMTAB, 0, data);
        s.header.sh_link = link;
        s.header.sh_entsize = Symbol::SIZE as u32;
        s
    }

    /// Encode relocations into a RELA section linked to `link`, applying
    /// to section `info`.
    pub(crate) fn rela_section(name: &str, entries: &[Rela], link: u32, info: u32) -> Section {
        let mut data = vec![0u8; entries.len() * Rela::SIZE];
        for (i, rela) in entries.iter().enumerate() {
            rela.store(&mut data, i * Rela::SIZE);
        }
        let mut s = section(name, SHT_RELA, 0, data);
        s.header.sh_link = link;
        s.header.sh_info = info;
        s.header.sh_entsize = Rela::SIZE as u32;
        s
    }

    /// Assemble an `ElfFile` whose header matches the section list.
    pub(crate) fn file_with(sections: Vec<Section>) -> ElfFile {
        let shstrndx = sections
            .iter()
            .position(|s| s.name == ".shstrtab")
            .unwrap_or(0);
        ElfFile {
            header: Header {
                e_shnum: sections.len() as u16,
                e_shstrndx: shstrndx as u16,
                ..Header::default()
            },
            sections,
        }
    }

    /// Decode every symbol in a SYMTAB section payload.
    pub(crate) fn symbols_of(section: &Section) -> Vec<Symbol> {
        (0..section.data.len() / Symbol::SIZE)
            .map(|i| Symbol::parse(&section.data, i * Symbol::SIZE))
            .collect()
    }

    /// Decode every relocation in a RELA section payload.
    pub(crate) fn relas_of(section: &Section) -> Vec<Rela> {
        (0..section.data.len() / Rela::SIZE)
            .map(|i| Rela::parse(&section.data, i * Rela::SIZE))
            .collect()
    }
}

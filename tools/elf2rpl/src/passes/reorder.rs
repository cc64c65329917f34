//! Section index reordering.
//!
//! The loader expects sections in a fixed order: NULL, code, exports,
//! read-only data, writable data, bss, relocations, imports, then the
//! symbol and string tables. Reindexing invalidates every index-typed
//! field in the file, so the pass runs in two steps: build the full
//! permutation first, then remap `e_shstrndx`, `sh_link`, RELA `sh_info`,
//! and symbol `st_shndx` through it. A one-pass in-place swap would
//! corrupt references it has not visited yet.

use anyhow::{bail, Result};
use rpl_elf::section::{
    SHF_EXECINSTR, SHF_WRITE, SHN_LORESERVE, SHT_NOBITS, SHT_PROGBITS, SHT_REL, SHT_RELA,
    SHT_RPL_EXPORTS, SHT_RPL_IMPORTS, SHT_STRTAB, SHT_SYMTAB,
};
use rpl_elf::{ElfFile, Section, Symbol};

/// Reassigns section indices to the loader's expected order and remaps
/// every index-bearing field through the permutation.
pub fn reorder_section_index(file: &mut ElfFile) -> Result<()> {
    let order = bucket_order(&file.sections);
    if order.len() != file.sections.len() {
        bail!(
            "cannot classify every section into the loader ordering ({} of {} placed)",
            order.len(),
            file.sections.len()
        );
    }

    let mut old: Vec<Option<Section>> = file.sections.drain(..).map(Some).collect();
    let mut reordered = Vec::with_capacity(order.len());
    for &index in &order {
        match old[index].take() {
            Some(section) => reordered.push(section),
            None => bail!("section {index} matched two reorder buckets"),
        }
    }
    file.sections = reordered;

    let mut old_to_new = vec![0u16; order.len()];
    for (new_index, &old_index) in order.iter().enumerate() {
        old_to_new[old_index] = new_index as u16;
    }

    remap_indices(file, &old_to_new)
}

/// Builds the new-index -> old-index permutation. Within each bucket the
/// original relative order is preserved.
fn bucket_order(sections: &[Section]) -> Vec<usize> {
    let buckets: [&dyn Fn(&Section) -> bool; 8] = [
        // Code
        &|s| s.header.sh_type == SHT_PROGBITS && s.header.sh_flags & SHF_EXECINSTR != 0,
        // Exports
        &|s| s.header.sh_type == SHT_RPL_EXPORTS,
        // Read-only data
        &|s| {
            s.header.sh_type == SHT_PROGBITS
                && s.header.sh_flags & (SHF_EXECINSTR | SHF_WRITE) == 0
        },
        // Writable data
        &|s| {
            s.header.sh_type == SHT_PROGBITS
                && s.header.sh_flags & SHF_EXECINSTR == 0
                && s.header.sh_flags & SHF_WRITE != 0
        },
        // BSS
        &|s| s.header.sh_type == SHT_NOBITS,
        // Relocations
        &|s| matches!(s.header.sh_type, SHT_REL | SHT_RELA),
        // Imports
        &|s| s.header.sh_type == SHT_RPL_IMPORTS,
        // Symbol and string tables
        &|s| matches!(s.header.sh_type, SHT_SYMTAB | SHT_STRTAB),
    ];

    let mut order = Vec::with_capacity(sections.len());
    order.push(0);
    for bucket in buckets {
        for (index, section) in sections.iter().enumerate() {
            if bucket(section) {
                order.push(index);
            }
        }
    }
    order
}

/// Remaps every index-typed field through the old -> new permutation.
/// Reserved symbol section indices (>= `SHN_LORESERVE`) are left alone.
fn remap_indices(file: &mut ElfFile, old_to_new: &[u16]) -> Result<()> {
    let shstrndx = file.header.e_shstrndx as usize;
    let Some(&new_shstrndx) = old_to_new.get(shstrndx) else {
        bail!("e_shstrndx {shstrndx} is out of range");
    };
    file.header.e_shstrndx = new_shstrndx;

    for (index, section) in file.sections.iter_mut().enumerate() {
        let link = section.header.sh_link as usize;
        match old_to_new.get(link) {
            Some(&new_link) => section.header.sh_link = new_link.into(),
            None => bail!("section {index} links to nonexistent section {link}"),
        }

        if section.header.sh_type == SHT_RELA {
            let info = section.header.sh_info as usize;
            match old_to_new.get(info) {
                Some(&new_info) => section.header.sh_info = new_info.into(),
                None => bail!("relocation section {index} targets nonexistent section {info}"),
            }
        }
    }

    for section in &mut file.sections {
        if section.header.sh_type != SHT_SYMTAB {
            continue;
        }
        for i in 0..section.data.len() / Symbol::SIZE {
            let mut sym = Symbol::parse(&section.data, i * Symbol::SIZE);
            if sym.st_shndx >= SHN_LORESERVE {
                continue;
            }
            let Some(&new_shndx) = old_to_new.get(sym.st_shndx as usize) else {
                bail!("symbol {i} references nonexistent section {}", sym.st_shndx);
            };
            sym.st_shndx = new_shndx;
            sym.store(&mut section.data, i * Symbol::SIZE);
        }
    }

    Ok(())
}

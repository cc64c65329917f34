//! Section placement: alignment overrides, loader virtual addresses,
//! and file offset assignment.

use anyhow::Result;
use rpl_elf::section::{
    SHF_ALLOC, SHF_EXECINSTR, SHT_NOBITS, SHT_PROGBITS, SHT_REL, SHT_RELA, SHT_RPL_CRCS,
    SHT_RPL_EXPORTS, SHT_RPL_FILEINFO, SHT_RPL_IMPORTS, SHT_STRTAB, SHT_SYMTAB, STT_FUNC,
    STT_OBJECT, STT_SECTION,
};
use rpl_elf::{align_up, ElfFile, Rela, Section, SectionHeader, Symbol, LOAD_BASE_ADDRESS};

use crate::verbose::vprintln;

/// Overrides `sh_addralign` with the loader's expected values.
pub fn fix_section_align(file: &mut ElfFile) -> Result<()> {
    for section in &mut file.sections {
        section.header.sh_addralign = match section.header.sh_type {
            SHT_PROGBITS => 32,
            SHT_NOBITS => 64,
            SHT_RPL_IMPORTS => 4,
            _ => section.header.sh_addralign,
        };
    }
    Ok(())
}

/// Places loader-segment sections at consecutive virtual addresses from
/// `LOAD_BASE_ADDRESS`.
///
/// The linker leaves the symbol and string tables without addresses, so
/// they are moved into the loader segment here and made loader-visible.
/// Visit order: `.fexports`, `.dexports`, `.symtab`, `.strtab`,
/// `.shstrtab`, then every import section in index order.
pub fn fix_loader_virtual_addresses(file: &mut ElfFile) -> Result<()> {
    let mut addr = LOAD_BASE_ADDRESS;

    for name in [".fexports", ".dexports"] {
        if let Some(index) = file.section_index(name) {
            place(file, index, &mut addr, false);
        }
    }

    for name in [".symtab", ".strtab", ".shstrtab"] {
        if let Some(index) = file.section_index(name) {
            place(file, index, &mut addr, true);
        }
    }

    for index in 0..file.sections.len() {
        if file.sections[index].header.sh_type == SHT_RPL_IMPORTS {
            place(file, index, &mut addr, false);
        }
    }

    Ok(())
}

/// Moves `sections[index]` to the aligned running address and advances
/// the address past its payload.
fn place(file: &mut ElfFile, index: usize, addr: &mut u32, make_alloc: bool) {
    let align = file.sections[index].header.sh_addralign.max(1);
    *addr = align_up(*addr, align);
    relocate_section(file, index, *addr);
    if make_alloc {
        file.sections[index].header.sh_flags |= SHF_ALLOC;
    }
    vprintln!(
        "    {} -> {:#010x}",
        file.sections[index].name,
        file.sections[index].header.sh_addr
    );
    *addr += file.sections[index].data.len() as u32;
}

/// Moves a section to `new_addr`, rewriting every object, function, and
/// section symbol plus every relocation whose address falls inside the
/// section's old range. The upper bound is inclusive: one-past-the-end
/// markers emitted at section ends move with the section.
fn relocate_section(file: &mut ElfFile, index: usize, new_addr: u32) {
    let old_addr = file.sections[index].header.sh_addr;
    let old_end = old_addr + file.sections[index].effective_size();

    for section in &mut file.sections {
        match section.header.sh_type {
            SHT_SYMTAB => {
                for i in 0..section.data.len() / Symbol::SIZE {
                    let mut sym = Symbol::parse(&section.data, i * Symbol::SIZE);
                    if !matches!(sym.sym_type(), STT_OBJECT | STT_FUNC | STT_SECTION) {
                        continue;
                    }
                    if sym.st_value >= old_addr && sym.st_value <= old_end {
                        sym.st_value = sym.st_value - old_addr + new_addr;
                        sym.store(&mut section.data, i * Symbol::SIZE);
                    }
                }
            }
            SHT_RELA => {
                for i in 0..section.data.len() / Rela::SIZE {
                    let mut rela = Rela::parse(&section.data, i * Rela::SIZE);
                    if rela.r_offset >= old_addr && rela.r_offset <= old_end {
                        rela.r_offset = rela.r_offset - old_addr + new_addr;
                        rela.store(&mut section.data, i * Rela::SIZE);
                    }
                }
            }
            _ => {}
        }
    }

    file.sections[index].header.sh_addr = new_addr;
}

/// Assigns file offsets and final sizes.
///
/// The first payload lands right after the section header table; groups
/// are laid out in the loader's expected file order, which differs from
/// the section index order. Sections matching no group (NULL, NOBITS)
/// keep their existing offset and size fields.
pub fn calculate_section_offsets(file: &mut ElfFile) -> Result<()> {
    let table_size = file.sections.len() as u32 * SectionHeader::SIZE as u32;
    let mut offset = file.header.e_shoff + align_up(table_size, 64);

    let groups: [&dyn Fn(&Section) -> bool; 8] = [
        &|s| s.header.sh_type == SHT_RPL_CRCS,
        &|s| s.header.sh_type == SHT_RPL_FILEINFO,
        // Data
        &|s| s.header.sh_type == SHT_PROGBITS && s.header.sh_flags & SHF_EXECINSTR == 0,
        &|s| s.header.sh_type == SHT_RPL_EXPORTS,
        &|s| s.header.sh_type == SHT_RPL_IMPORTS,
        &|s| matches!(s.header.sh_type, SHT_SYMTAB | SHT_STRTAB),
        // Code
        &|s| s.header.sh_type == SHT_PROGBITS && s.header.sh_flags & SHF_EXECINSTR != 0,
        &|s| matches!(s.header.sh_type, SHT_REL | SHT_RELA),
    ];

    for group in groups {
        for section in &mut file.sections {
            if group(section) {
                section.header.sh_offset = offset;
                section.header.sh_size = section.data.len() as u32;
                offset += section.header.sh_size;
            }
        }
    }

    Ok(())
}

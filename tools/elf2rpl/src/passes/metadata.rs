//! Synthesized metadata sections and the RPL file header.
//!
//! Two sections are appended at the end of the file: the CRC table and
//! the file info record, with the CRC table immediately before the file
//! info as the loader requires.

use anyhow::{bail, Result};
use rpl_elf::header::{EABI_CAFE, ELFCLASS32, ELFDATA2MSB, EM_PPC, ET_RPX, EV_CURRENT};
use rpl_elf::section::{SHT_RPL_CRCS, SHT_RPL_FILEINFO};
use rpl_elf::{
    align_up, ElfFile, Header, RplFileInfo, Section, SectionHeader, CODE_BASE_ADDRESS,
    DATA_BASE_ADDRESS, LOAD_BASE_ADDRESS, RPL_FILEINFO_VERSION, RPL_IS_RPX,
};

use crate::verbose::vprintln;

/// Appends the file info section, with segment sizes measured over every
/// section already present.
///
/// Sections are bucketed by virtual address into the code, data, and
/// loader segments; each segment size is the furthest section end within
/// it, rounded up to the segment alignment. Sections without an address
/// occupy loader scratch space instead and are counted into `temp_size`
/// with a fixed 128-byte pad each.
pub fn generate_file_info_section(file: &mut ElfFile) -> Result<()> {
    let mut info = RplFileInfo {
        version: RPL_FILEINFO_VERSION,
        text_align: 32,
        data_align: 4096,
        load_align: 4,
        stack_size: 0x10000,
        heap_size: 0x8000,
        flags: RPL_IS_RPX,
        min_version: 0x5078,
        compression_level: -1,
        cafe_sdk_version: 0x51BA,
        cafe_sdk_revision: 0xCCD1,
        ..RplFileInfo::default()
    };

    for section in &file.sections {
        let addr = section.header.sh_addr;
        if (CODE_BASE_ADDRESS..DATA_BASE_ADDRESS).contains(&addr) {
            let end = addr + section.header.sh_size - CODE_BASE_ADDRESS;
            info.text_size = info.text_size.max(end);
        } else if (DATA_BASE_ADDRESS..LOAD_BASE_ADDRESS).contains(&addr) {
            let end = addr + section.header.sh_size - DATA_BASE_ADDRESS;
            info.data_size = info.data_size.max(end);
        } else if addr >= LOAD_BASE_ADDRESS {
            let end = addr + section.header.sh_size - LOAD_BASE_ADDRESS;
            info.load_size = info.load_size.max(end);
        } else if addr == 0
            && section.header.sh_type != SHT_RPL_CRCS
            && section.header.sh_type != SHT_RPL_FILEINFO
        {
            info.temp_size += section.effective_size() + 128;
        }
    }

    info.text_size = align_up(info.text_size, info.text_align);
    info.data_size = align_up(info.data_size, info.data_align);
    info.load_size = align_up(info.load_size, info.load_align);

    vprintln!(
        "    text {:#x}, data {:#x}, load {:#x}, temp {:#x}",
        info.text_size,
        info.data_size,
        info.load_size,
        info.temp_size
    );

    file.sections.push(Section {
        header: SectionHeader {
            sh_type: SHT_RPL_FILEINFO,
            sh_addralign: 4,
            ..SectionHeader::default()
        },
        name: String::new(),
        data: info.to_bytes().to_vec(),
    });
    Ok(())
}

/// Inserts the CRC table section immediately before the file info.
///
/// One big-endian CRC-32 per section in index order; empty payloads
/// contribute 0. The table carries a slot for every final section
/// including itself, and its own slot is pre-filled with 0.
pub fn generate_crc_section(file: &mut ElfFile) -> Result<()> {
    if file.sections.last().map(|s| s.header.sh_type) != Some(SHT_RPL_FILEINFO) {
        bail!("file info section must be generated first");
    }

    let mut crcs: Vec<u32> = file
        .sections
        .iter()
        .map(|s| {
            if s.data.is_empty() {
                0
            } else {
                crc32fast::hash(&s.data)
            }
        })
        .collect();

    // The zero slot for this section, which lands just before file info
    crcs.insert(crcs.len() - 1, 0);

    let mut data = Vec::with_capacity(crcs.len() * 4);
    for crc in &crcs {
        data.extend_from_slice(&crc.to_be_bytes());
    }

    let index = file.sections.len() - 1;
    file.sections.insert(
        index,
        Section {
            header: SectionHeader {
                sh_type: SHT_RPL_CRCS,
                sh_addralign: 4,
                sh_entsize: 4,
                ..SectionHeader::default()
            },
            name: String::new(),
            data,
        },
    );
    Ok(())
}

/// Rewrites the file header with the RPL constants: the platform ABI,
/// the RPX file type, no program headers, and a section header table at
/// the first 64-byte boundary past the header.
pub fn fix_file_header(file: &mut ElfFile) -> Result<()> {
    let Some(shstrndx) = file.section_index(".shstrtab") else {
        bail!("no .shstrtab section present");
    };
    let shnum = file.sections.len() as u16;

    let header = &mut file.header;
    header.class = ELFCLASS32;
    header.encoding = ELFDATA2MSB;
    header.ident_version = EV_CURRENT;
    header.abi = EABI_CAFE;
    header.e_type = ET_RPX;
    header.e_machine = EM_PPC;
    header.e_version = 1;
    header.e_flags = 0;
    header.e_phoff = 0;
    header.e_phentsize = 0;
    header.e_phnum = 0;
    header.e_shoff = align_up(Header::SIZE as u32, 64);
    header.e_shnum = shnum;
    header.e_shentsize = SectionHeader::SIZE as u16;
    header.e_ehsize = Header::SIZE as u16;
    header.e_shstrndx = shstrndx as u16;
    Ok(())
}

//! `.bss` type restoration.
//!
//! Linker scripts sometimes emit `.bss` as PROGBITS with an explicit
//! zero payload. The loader expects it as NOBITS.

use anyhow::{bail, Result};
use rpl_elf::section::{SHT_NOBITS, SHT_PROGBITS};
use rpl_elf::ElfFile;

/// Converts a PROGBITS `.bss` back to NOBITS.
///
/// The payload must be all zeroes. `sh_size` is retained so the loader
/// still reserves the right amount of memory; the payload and file
/// offset are dropped.
pub fn fix_bss_nobits(file: &mut ElfFile) -> Result<()> {
    let Some(index) = file.section_index(".bss") else {
        return Ok(());
    };

    let section = &mut file.sections[index];
    if section.header.sh_type != SHT_PROGBITS {
        return Ok(());
    }

    if let Some(pos) = section.data.iter().position(|&b| b != 0) {
        bail!(".bss contains a non-zero byte at offset {pos:#x}");
    }

    section.header.sh_type = SHT_NOBITS;
    section.header.sh_offset = 0;
    section.data.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testutil::{file_with, section};
    use rpl_elf::section::SHF_WRITE;
    use rpl_elf::Section;

    #[test]
    fn converts_zeroed_progbits_bss() {
        let mut bss = section(".bss", SHT_PROGBITS, SHF_WRITE, vec![0u8; 16]);
        bss.header.sh_offset = 0x200;
        let mut file = file_with(vec![Section::default(), bss]);

        fix_bss_nobits(&mut file).expect("all-zero .bss converts");

        let bss = &file.sections[1];
        assert_eq!(bss.header.sh_type, SHT_NOBITS);
        assert_eq!(bss.header.sh_offset, 0);
        assert_eq!(bss.header.sh_size, 16);
        assert!(bss.data.is_empty());
    }

    #[test]
    fn rejects_nonzero_bss() {
        let mut data = vec![0u8; 16];
        data[9] = 0xAB;
        let bss = section(".bss", SHT_PROGBITS, SHF_WRITE, data);
        let mut file = file_with(vec![Section::default(), bss]);

        let err = fix_bss_nobits(&mut file).unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn missing_bss_is_fine() {
        let mut file = file_with(vec![Section::default()]);
        fix_bss_nobits(&mut file).expect("no .bss is not an error");
    }

    #[test]
    fn nobits_bss_is_untouched() {
        let mut bss = section(".bss", SHT_NOBITS, SHF_WRITE, Vec::new());
        bss.header.sh_size = 0x40;
        bss.header.sh_offset = 0x123;
        let mut file = file_with(vec![Section::default(), bss]);

        fix_bss_nobits(&mut file).expect("NOBITS .bss passes through");
        assert_eq!(file.sections[1].header.sh_offset, 0x123);
        assert_eq!(file.sections[1].header.sh_size, 0x40);
    }
}

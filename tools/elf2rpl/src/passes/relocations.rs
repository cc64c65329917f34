//! Relocation fix-up.
//!
//! The target loader only understands a subset of the PowerPC relocation
//! types. Supported types pass through untouched; `R_PPC_REL32` is
//! rewritten into a `GHS_REL16_HI`/`GHS_REL16_LO` pair; anything else
//! fails the pass. The scan always runs to completion so a single run
//! reports every distinct offending type.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use rpl_elf::reloc::{
    R_PPC_ADDR16_HA, R_PPC_ADDR16_HI, R_PPC_ADDR16_LO, R_PPC_ADDR32, R_PPC_DIAB_RELSDA_HA,
    R_PPC_DIAB_RELSDA_HI, R_PPC_DIAB_RELSDA_LO, R_PPC_DIAB_SDA21_HA, R_PPC_DIAB_SDA21_HI,
    R_PPC_DIAB_SDA21_LO, R_PPC_DTPMOD32, R_PPC_DTPREL32, R_PPC_EMB_RELSDA, R_PPC_EMB_SDA21,
    R_PPC_GHS_REL16_HI, R_PPC_GHS_REL16_LO, R_PPC_NONE, R_PPC_REL14, R_PPC_REL24, R_PPC_REL32,
};
use rpl_elf::section::{SHT_RELA, SHT_SYMTAB};
use rpl_elf::{ElfFile, Rela, Symbol};

/// Rewrites unsupported relocations and clears RELA section flags.
///
/// A `R_PPC_REL32` becomes `GHS_REL16_HI` in place, plus an appended
/// `GHS_REL16_LO` with the same symbol, offset + 2, and addend + 2.
/// Appending is deferred until a section's scan finishes so entry
/// offsets within the payload stay stable while iterating.
pub fn fix_relocations(file: &mut ElfFile) -> Result<()> {
    let mut unsupported: BTreeSet<u8> = BTreeSet::new();
    let mut dangling: Vec<String> = Vec::new();

    for index in 0..file.sections.len() {
        if file.sections[index].header.sh_type != SHT_RELA {
            continue;
        }

        let link = file.sections[index].header.sh_link as usize;
        let num_symbols = file
            .sections
            .get(link)
            .filter(|s| s.header.sh_type == SHT_SYMTAB)
            .map_or(0, |s| s.data.len() / Symbol::SIZE);

        let section = &mut file.sections[index];
        section.header.sh_flags = 0;

        let mut appended: Vec<Rela> = Vec::new();
        for i in 0..section.data.len() / Rela::SIZE {
            let mut rela = Rela::parse(&section.data, i * Rela::SIZE);
            match rela.reloc_type() {
                R_PPC_NONE
                | R_PPC_ADDR32
                | R_PPC_ADDR16_LO
                | R_PPC_ADDR16_HI
                | R_PPC_ADDR16_HA
                | R_PPC_REL24
                | R_PPC_REL14
                | R_PPC_DTPMOD32
                | R_PPC_DTPREL32
                | R_PPC_EMB_SDA21
                | R_PPC_EMB_RELSDA
                | R_PPC_DIAB_SDA21_LO
                | R_PPC_DIAB_SDA21_HI
                | R_PPC_DIAB_SDA21_HA
                | R_PPC_DIAB_RELSDA_LO
                | R_PPC_DIAB_RELSDA_HI
                | R_PPC_DIAB_RELSDA_HA => {}

                R_PPC_REL32 => {
                    let sym = rela.sym_index();
                    if sym as usize >= num_symbols {
                        dangling.push(format!(
                            "{} entry {i} references missing symbol {sym}",
                            section.name
                        ));
                        continue;
                    }

                    rela.r_info = Rela::make_info(sym, R_PPC_GHS_REL16_HI);
                    rela.store(&mut section.data, i * Rela::SIZE);

                    appended.push(Rela {
                        r_offset: rela.r_offset + 2,
                        r_info: Rela::make_info(sym, R_PPC_GHS_REL16_LO),
                        r_addend: rela.r_addend + 2,
                    });
                }

                other => {
                    unsupported.insert(other);
                }
            }
        }

        for rela in appended {
            section.data.extend_from_slice(&rela.to_bytes());
        }
    }

    let mut problems = dangling;
    if !unsupported.is_empty() {
        let types: Vec<String> = unsupported.iter().map(u8::to_string).collect();
        problems.push(format!(
            "unsupported relocation type(s): {}",
            types.join(", ")
        ));
    }
    if !problems.is_empty() {
        bail!("{}", problems.join("; "));
    }
    Ok(())
}

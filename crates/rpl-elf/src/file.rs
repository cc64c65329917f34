//! Owned in-memory model of an ELF file.
//!
//! [`ElfFile`] holds the file header plus an ordered list of sections;
//! a section's position in that list is its ELF section index, so every
//! cross-reference in the file (symbol `st_shndx`, relocation symbol
//! indices, `sh_link`/`sh_info`, the header's `e_shstrndx`) indexes into
//! it. Passes mutate the model in place; [`ElfFile::to_bytes`] serializes
//! it back at whatever offsets the layout pass assigned.

use crate::header::{ElfError, Header};
use crate::section::{SectionHeader, StringTable, SHT_NOBITS};

/// A section: header, resolved name, and payload bytes.
///
/// NOBITS sections carry an empty payload; their logical size lives in
/// `header.sh_size`.
#[derive(Debug, Clone, Default)]
pub struct Section {
    /// The section header record.
    pub header: SectionHeader,
    /// Name resolved from the section header string table at load time.
    pub name: String,
    /// Payload bytes (empty for NOBITS).
    pub data: Vec<u8>,
}

impl Section {
    /// Returns the payload length, or `sh_size` when there is no payload.
    #[must_use]
    pub fn effective_size(&self) -> u32 {
        if self.data.is_empty() {
            self.header.sh_size
        } else {
            self.data.len() as u32
        }
    }
}

/// An ELF file held fully in memory.
#[derive(Debug, Clone, Default)]
pub struct ElfFile {
    /// The file header.
    pub header: Header,
    /// Sections in index order.
    pub sections: Vec<Section>,
}

impl ElfFile {
    /// Parse a 32-bit big-endian PowerPC ELF from raw bytes.
    ///
    /// Section payloads are copied out of `data`; names are resolved from
    /// the section header string table named by `e_shstrndx`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if header validation fails, a section's
    /// payload lies outside `data`, or a section name cannot be resolved.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        let header = Header::parse(data)?;

        let shoff = header.e_shoff as usize;
        let mut sections = Vec::with_capacity(header.e_shnum as usize);
        for i in 0..header.e_shnum as usize {
            let sh = SectionHeader::parse(data, shoff + i * SectionHeader::SIZE);

            let payload = if sh.sh_size > 0 && sh.sh_type != SHT_NOBITS {
                let start = sh.sh_offset as usize;
                let end = start
                    .checked_add(sh.sh_size as usize)
                    .ok_or(ElfError::InvalidOffset)?;
                if end > data.len() {
                    return Err(ElfError::Truncated);
                }
                data[start..end].to_vec()
            } else {
                Vec::new()
            };

            sections.push(Section {
                header: sh,
                name: String::new(),
                data: payload,
            });
        }

        let shstrndx = header.e_shstrndx as usize;
        let names = sections
            .get(shstrndx)
            .map(|s| s.data.clone())
            .ok_or(ElfError::InvalidOffset)?;
        let names = StringTable::new(&names);
        for (i, section) in sections.iter_mut().enumerate() {
            section.name = names
                .get(section.header.sh_name)
                .ok_or(ElfError::BadSectionName { index: i })?
                .to_string();
        }

        Ok(Self { header, sections })
    }

    /// Serialize the file: header at offset 0, section header table at
    /// `e_shoff`, each non-empty payload at its `sh_offset`.
    ///
    /// The buffer is sized to cover the highest payload end (gaps are
    /// zero-filled), so the output is at least as long as every
    /// `sh_offset + payload` it contains.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let shoff = self.header.e_shoff as usize;
        let mut total = Header::SIZE.max(shoff + self.sections.len() * SectionHeader::SIZE);
        for section in &self.sections {
            if !section.data.is_empty() {
                total = total.max(section.header.sh_offset as usize + section.data.len());
            }
        }

        let mut out = vec![0u8; total];
        out[..Header::SIZE].copy_from_slice(&self.header.to_bytes());

        for (i, section) in self.sections.iter().enumerate() {
            section.header.store(&mut out, shoff + i * SectionHeader::SIZE);
        }

        for section in &self.sections {
            if !section.data.is_empty() {
                let start = section.header.sh_offset as usize;
                out[start..start + section.data.len()].copy_from_slice(&section.data);
            }
        }

        out
    }

    /// Returns the index of the first section with the given name.
    #[must_use]
    pub fn section_index(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }
}

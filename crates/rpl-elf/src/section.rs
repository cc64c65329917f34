//! ELF32 section headers, symbols, and string tables.
//!
//! Covers the standard section header and symbol record layouts plus the
//! RPL-specific section types and the deflated-payload flag.

use crate::header::{be_u16, be_u32, put_u16, put_u32};

/// Section type: inactive entry.
pub const SHT_NULL: u32 = 0;

/// Section type: program-defined contents.
pub const SHT_PROGBITS: u32 = 1;

/// Section type: symbol table.
pub const SHT_SYMTAB: u32 = 2;

/// Section type: string table.
pub const SHT_STRTAB: u32 = 3;

/// Section type: relocation entries with addends.
pub const SHT_RELA: u32 = 4;

/// Section type: zero-initialized data, no file contents.
pub const SHT_NOBITS: u32 = 8;

/// Section type: relocation entries without addends.
pub const SHT_REL: u32 = 9;

/// Section type: RPL export table.
pub const SHT_RPL_EXPORTS: u32 = 0x8000_0001;

/// Section type: RPL import table.
pub const SHT_RPL_IMPORTS: u32 = 0x8000_0002;

/// Section type: per-section CRC table.
pub const SHT_RPL_CRCS: u32 = 0x8000_0003;

/// Section type: RPL file info record.
pub const SHT_RPL_FILEINFO: u32 = 0x8000_0004;

/// Section flag: writable data.
pub const SHF_WRITE: u32 = 0x1;

/// Section flag: occupies memory during execution.
pub const SHF_ALLOC: u32 = 0x2;

/// Section flag: executable machine instructions.
pub const SHF_EXECINSTR: u32 = 0x4;

/// Section flag: payload is a 4-byte inflated-size prefix followed by a
/// zlib deflate stream.
pub const SHF_DEFLATED: u32 = 0x0800_0000;

/// Symbol type: data object.
pub const STT_OBJECT: u8 = 1;

/// Symbol type: function.
pub const STT_FUNC: u8 = 2;

/// Symbol type: section.
pub const STT_SECTION: u8 = 3;

/// First reserved special section index.
pub const SHN_LORESERVE: u16 = 0xFF00;

/// Size of an ELF32 section header entry (40 bytes).
pub const ELF32_SHDR_SIZE: usize = 40;

/// Size of an ELF32 symbol entry (16 bytes).
pub const ELF32_SYM_SIZE: usize = 16;

/// ELF32 section header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionHeader {
    /// Offset into the section header string table for this section's name.
    pub sh_name: u32,
    /// Section type (`SHT_PROGBITS`, `SHT_RPL_IMPORTS`, etc.).
    pub sh_type: u32,
    /// Section flags.
    pub sh_flags: u32,
    /// Virtual address of the section in memory (0 for link-only sections).
    pub sh_addr: u32,
    /// File offset of the section data.
    pub sh_offset: u32,
    /// Size of the section data in bytes.
    pub sh_size: u32,
    /// Associated section index (e.g., `.strtab` index for `.symtab`).
    pub sh_link: u32,
    /// Extra info (for `SHT_RELA`: the section the relocations apply to).
    pub sh_info: u32,
    /// Required alignment of the section.
    pub sh_addralign: u32,
    /// Size of each entry (for sections with fixed-size entries).
    pub sh_entsize: u32,
}

impl SectionHeader {
    /// Size of the encoded section header in bytes.
    pub const SIZE: usize = ELF32_SHDR_SIZE;

    /// Parse a section header from raw bytes at the given offset.
    ///
    /// The caller must ensure `offset + Self::SIZE <= data.len()`.
    #[must_use]
    pub fn parse(data: &[u8], offset: usize) -> Self {
        let b = &data[offset..];
        Self {
            sh_name: be_u32(b, 0),
            sh_type: be_u32(b, 4),
            sh_flags: be_u32(b, 8),
            sh_addr: be_u32(b, 12),
            sh_offset: be_u32(b, 16),
            sh_size: be_u32(b, 20),
            sh_link: be_u32(b, 24),
            sh_info: be_u32(b, 28),
            sh_addralign: be_u32(b, 32),
            sh_entsize: be_u32(b, 36),
        }
    }

    /// Encode the section header into `data` at the given offset.
    ///
    /// The caller must ensure `offset + Self::SIZE <= data.len()`.
    pub fn store(&self, data: &mut [u8], offset: usize) {
        let b = &mut data[offset..];
        put_u32(b, 0, self.sh_name);
        put_u32(b, 4, self.sh_type);
        put_u32(b, 8, self.sh_flags);
        put_u32(b, 12, self.sh_addr);
        put_u32(b, 16, self.sh_offset);
        put_u32(b, 20, self.sh_size);
        put_u32(b, 24, self.sh_link);
        put_u32(b, 28, self.sh_info);
        put_u32(b, 32, self.sh_addralign);
        put_u32(b, 36, self.sh_entsize);
    }
}

/// ELF32 symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Symbol {
    /// Offset into the associated string table for this symbol's name.
    pub st_name: u32,
    /// Symbol value (address for defined symbols).
    pub st_value: u32,
    /// Symbol size in bytes.
    pub st_size: u32,
    /// Symbol type (low 4 bits) and binding (high 4 bits).
    pub st_info: u8,
    /// Symbol visibility.
    pub st_other: u8,
    /// Section index this symbol is defined in.
    pub st_shndx: u16,
}

impl Symbol {
    /// Size of the encoded symbol in bytes.
    pub const SIZE: usize = ELF32_SYM_SIZE;

    /// Parse a symbol from raw bytes at the given offset.
    ///
    /// The caller must ensure `offset + Self::SIZE <= data.len()`.
    #[must_use]
    pub fn parse(data: &[u8], offset: usize) -> Self {
        let b = &data[offset..];
        Self {
            st_name: be_u32(b, 0),
            st_value: be_u32(b, 4),
            st_size: be_u32(b, 8),
            st_info: b[12],
            st_other: b[13],
            st_shndx: be_u16(b, 14),
        }
    }

    /// Encode the symbol into `data` at the given offset.
    pub fn store(&self, data: &mut [u8], offset: usize) {
        let b = &mut data[offset..];
        put_u32(b, 0, self.st_name);
        put_u32(b, 4, self.st_value);
        put_u32(b, 8, self.st_size);
        b[12] = self.st_info;
        b[13] = self.st_other;
        put_u16(b, 14, self.st_shndx);
    }

    /// Returns the symbol type (lower 4 bits of `st_info`).
    #[must_use]
    pub fn sym_type(&self) -> u8 {
        self.st_info & 0xf
    }

    /// Returns the symbol binding (upper 4 bits of `st_info`).
    #[must_use]
    pub fn sym_bind(&self) -> u8 {
        self.st_info >> 4
    }
}

/// A wrapper around a NUL-terminated string table payload.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Creates a new string table from the raw section data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Looks up a NUL-terminated string at the given byte offset.
    ///
    /// Returns `None` if the offset is out of bounds, no terminator is
    /// found, or the string is not valid UTF-8.
    #[must_use]
    pub fn get(&self, offset: u32) -> Option<&'a str> {
        let start = offset as usize;
        if start >= self.data.len() {
            return None;
        }
        let remaining = &self.data[start..];
        let nul_pos = remaining.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&remaining[..nul_pos]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_header_round_trip() {
        let hdr = SectionHeader {
            sh_name: 1,
            sh_type: SHT_PROGBITS,
            sh_flags: SHF_ALLOC | SHF_EXECINSTR,
            sh_addr: 0x0200_0000,
            sh_offset: 0x100,
            sh_size: 0x20,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 32,
            sh_entsize: 0,
        };

        let mut buf = vec![0u8; ELF32_SHDR_SIZE];
        hdr.store(&mut buf, 0);
        assert_eq!(SectionHeader::parse(&buf, 0), hdr);
    }

    #[test]
    fn section_header_is_big_endian() {
        let hdr = SectionHeader {
            sh_type: SHT_RPL_IMPORTS,
            ..SectionHeader::default()
        };
        let mut buf = vec![0u8; ELF32_SHDR_SIZE];
        hdr.store(&mut buf, 0);
        assert_eq!(&buf[4..8], &[0x80, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn symbol_round_trip() {
        let sym = Symbol {
            st_name: 7,
            st_value: 0x0200_0010,
            st_size: 4,
            st_info: 0x12, // GLOBAL | FUNC
            st_other: 0,
            st_shndx: 1,
        };

        let mut buf = vec![0u8; ELF32_SYM_SIZE * 2];
        sym.store(&mut buf, ELF32_SYM_SIZE);
        let parsed = Symbol::parse(&buf, ELF32_SYM_SIZE);
        assert_eq!(parsed, sym);
        assert_eq!(parsed.sym_type(), STT_FUNC);
        assert_eq!(parsed.sym_bind(), 1);
    }

    #[test]
    fn string_table_lookup() {
        let table = StringTable::new(b"\0.text\0.symtab\0");
        assert_eq!(table.get(0), Some(""));
        assert_eq!(table.get(1), Some(".text"));
        assert_eq!(table.get(7), Some(".symtab"));
    }

    #[test]
    fn string_table_out_of_bounds() {
        let table = StringTable::new(b"\0.text\0");
        assert_eq!(table.get(100), None);
    }

    #[test]
    fn string_table_missing_terminator() {
        let table = StringTable::new(b"abc");
        assert_eq!(table.get(0), None);
    }
}

//! ELF32 file header encoding and decoding.
//!
//! The RPL container keeps the standard 52-byte ELF32 header layout but
//! repurposes the OS-ABI and ABI-version ident bytes as one big-endian
//! `u16` (`EABI_CAFE`) and uses the nonstandard file type `0xFE01`.

use std::fmt;

/// ELF magic bytes: `\x7fELF`.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 32-bit.
pub const ELFCLASS32: u8 = 1;

/// ELF data encoding: big-endian.
pub const ELFDATA2MSB: u8 = 2;

/// ELF identification version.
pub const EV_CURRENT: u8 = 1;

/// ELF machine: PowerPC.
pub const EM_PPC: u16 = 20;

/// ABI ident value for the target platform, spanning the OS-ABI and
/// ABI-version bytes.
pub const EABI_CAFE: u16 = 0xCAFE;

/// ELF type of an RPX executable.
pub const ET_RPX: u16 = 0xFE01;

/// Size of an ELF32 file header (52 bytes).
pub const ELF32_EHDR_SIZE: usize = 52;

/// Read a big-endian `u16` from `data` at byte offset `off`.
///
/// # Panics
///
/// Panics if `off + 2 > data.len()`. Callers must bounds-check first.
pub(crate) fn be_u16(data: &[u8], off: usize) -> u16 {
    u16::from_be_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a big-endian `u32` from `data` at byte offset `off`.
pub(crate) fn be_u32(data: &[u8], off: usize) -> u32 {
    u32::from_be_bytes(*data[off..].first_chunk().unwrap())
}

/// Write a big-endian `u16` into `data` at byte offset `off`.
pub(crate) fn put_u16(data: &mut [u8], off: usize, value: u16) {
    data[off..off + 2].copy_from_slice(&value.to_be_bytes());
}

/// Write a big-endian `u32` into `data` at byte offset `off`.
pub(crate) fn put_u32(data: &mut [u8], off: usize, value: u32) {
    data[off..off + 4].copy_from_slice(&value.to_be_bytes());
}

/// Errors that can occur when decoding an ELF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// The file does not start with the ELF magic bytes.
    BadMagic([u8; 4]),
    /// The ELF file is not 32-bit (`ELFCLASS32`).
    UnsupportedClass(u8),
    /// The ELF file is not big-endian.
    UnsupportedEncoding(u8),
    /// The ELF machine type is not `EM_PPC`.
    UnsupportedMachine(u16),
    /// The ELF identification version is not `EV_CURRENT`.
    UnsupportedVersion(u8),
    /// The input data is too short for the declared structure.
    Truncated,
    /// A header offset or size is out of bounds.
    InvalidOffset,
    /// A section name could not be resolved from the string table.
    BadSectionName {
        /// Index of the section whose name failed to resolve.
        index: usize,
    },
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic(seen) => {
                write!(f, "invalid ELF magic bytes {seen:02x?} (expected 7f 45 4c 46)")
            }
            Self::UnsupportedClass(seen) => {
                write!(f, "unsupported ELF class {seen} (expected {ELFCLASS32}, 32-bit)")
            }
            Self::UnsupportedEncoding(seen) => {
                write!(f, "unsupported data encoding {seen} (expected {ELFDATA2MSB}, big-endian)")
            }
            Self::UnsupportedMachine(seen) => {
                write!(f, "unsupported machine type {seen} (expected {EM_PPC}, PowerPC)")
            }
            Self::UnsupportedVersion(seen) => {
                write!(f, "unsupported ELF version {seen} (expected {EV_CURRENT})")
            }
            Self::Truncated => write!(f, "input data truncated"),
            Self::InvalidOffset => write!(f, "invalid header offset or size"),
            Self::BadSectionName { index } => {
                write!(f, "section {index} has an unresolvable name")
            }
        }
    }
}

impl std::error::Error for ElfError {}

/// ELF32 file header.
///
/// The four magic bytes are implicit; everything else is stored as parsed
/// host-order values and converted back to big-endian on serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// ELF class ident byte (`ELFCLASS32`).
    pub class: u8,
    /// Data encoding ident byte (`ELFDATA2MSB`).
    pub encoding: u8,
    /// Identification version ident byte (`EV_CURRENT`).
    pub ident_version: u8,
    /// Platform ABI, one big-endian `u16` over ident bytes 7 and 8.
    pub abi: u16,
    /// Object file type.
    pub e_type: u16,
    /// Target machine architecture.
    pub e_machine: u16,
    /// Object file version.
    pub e_version: u32,
    /// Virtual address of the entry point.
    pub e_entry: u32,
    /// Offset of the program header table in the file.
    pub e_phoff: u32,
    /// Offset of the section header table in the file.
    pub e_shoff: u32,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of this header.
    pub e_ehsize: u16,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// Size of each section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header string table index.
    pub e_shstrndx: u16,
}

impl Header {
    /// Size of the encoded header in bytes.
    pub const SIZE: usize = ELF32_EHDR_SIZE;

    /// Parse and validate an ELF32 big-endian PowerPC header.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] naming the observed value if the magic, class,
    /// encoding, machine, or ident version does not match, or if the data
    /// is too short for the header or the declared section header table.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < Self::SIZE {
            return Err(ElfError::Truncated);
        }

        if data[..4] != ELF_MAGIC {
            return Err(ElfError::BadMagic([data[0], data[1], data[2], data[3]]));
        }

        if data[4] != ELFCLASS32 {
            return Err(ElfError::UnsupportedClass(data[4]));
        }

        if data[5] != ELFDATA2MSB {
            return Err(ElfError::UnsupportedEncoding(data[5]));
        }

        if data[6] != EV_CURRENT {
            return Err(ElfError::UnsupportedVersion(data[6]));
        }

        let e_machine = be_u16(data, 18);
        if e_machine != EM_PPC {
            return Err(ElfError::UnsupportedMachine(e_machine));
        }

        let header = Self {
            class: data[4],
            encoding: data[5],
            ident_version: data[6],
            abi: be_u16(data, 7),
            e_type: be_u16(data, 16),
            e_machine,
            e_version: be_u32(data, 20),
            e_entry: be_u32(data, 24),
            e_phoff: be_u32(data, 28),
            e_shoff: be_u32(data, 32),
            e_flags: be_u32(data, 36),
            e_ehsize: be_u16(data, 40),
            e_phentsize: be_u16(data, 42),
            e_phnum: be_u16(data, 44),
            e_shentsize: be_u16(data, 46),
            e_shnum: be_u16(data, 48),
            e_shstrndx: be_u16(data, 50),
        };

        // Validate section header table bounds (if present)
        if header.e_shnum > 0 {
            let sh_end = u64::from(header.e_shoff)
                + u64::from(header.e_shnum) * crate::section::ELF32_SHDR_SIZE as u64;
            if sh_end > data.len() as u64 {
                return Err(ElfError::InvalidOffset);
            }
        }

        Ok(header)
    }

    /// Encode the header as 52 big-endian bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        b[0..4].copy_from_slice(&ELF_MAGIC);
        b[4] = self.class;
        b[5] = self.encoding;
        b[6] = self.ident_version;
        put_u16(&mut b, 7, self.abi);
        // ident bytes 9..16 stay zero
        put_u16(&mut b, 16, self.e_type);
        put_u16(&mut b, 18, self.e_machine);
        put_u32(&mut b, 20, self.e_version);
        put_u32(&mut b, 24, self.e_entry);
        put_u32(&mut b, 28, self.e_phoff);
        put_u32(&mut b, 32, self.e_shoff);
        put_u32(&mut b, 36, self.e_flags);
        put_u16(&mut b, 40, self.e_ehsize);
        put_u16(&mut b, 42, self.e_phentsize);
        put_u16(&mut b, 44, self.e_phnum);
        put_u16(&mut b, 46, self.e_shentsize);
        put_u16(&mut b, 48, self.e_shnum);
        put_u16(&mut b, 50, self.e_shstrndx);
        b
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal valid ELF32 BE PPC header (52 bytes) as a `Vec<u8>`.
    ///
    /// Defaults: machine EM_PPC, entry 0x02000020, no program headers, no
    /// section headers.
    pub(crate) fn make_elf_header() -> Vec<u8> {
        let mut buf = vec![0u8; ELF32_EHDR_SIZE];

        buf[0..4].copy_from_slice(&ELF_MAGIC);
        buf[4] = ELFCLASS32;
        buf[5] = ELFDATA2MSB;
        buf[6] = EV_CURRENT;
        // e_type: ET_EXEC
        put_u16(&mut buf, 16, 2);
        put_u16(&mut buf, 18, EM_PPC);
        put_u32(&mut buf, 20, 1);
        put_u32(&mut buf, 24, 0x0200_0020);
        put_u16(&mut buf, 40, ELF32_EHDR_SIZE as u16);
        put_u16(&mut buf, 46, crate::section::ELF32_SHDR_SIZE as u16);

        buf
    }

    #[test]
    fn parse_valid_header() {
        let buf = make_elf_header();
        let hdr = Header::parse(&buf).expect("valid header");
        assert_eq!(hdr.class, ELFCLASS32);
        assert_eq!(hdr.encoding, ELFDATA2MSB);
        assert_eq!(hdr.e_type, 2);
        assert_eq!(hdr.e_machine, EM_PPC);
        assert_eq!(hdr.e_entry, 0x0200_0020);
        assert_eq!(hdr.e_shnum, 0);
    }

    #[test]
    fn reject_bad_magic() {
        let mut buf = make_elf_header();
        buf[0] = 0x00;
        assert_eq!(
            Header::parse(&buf),
            Err(ElfError::BadMagic([0x00, b'E', b'L', b'F']))
        );
    }

    #[test]
    fn reject_64bit_class() {
        let mut buf = make_elf_header();
        buf[4] = 2; // ELFCLASS64
        assert_eq!(Header::parse(&buf), Err(ElfError::UnsupportedClass(2)));
    }

    #[test]
    fn reject_little_endian() {
        let mut buf = make_elf_header();
        buf[5] = 1; // ELFDATA2LSB
        assert_eq!(Header::parse(&buf), Err(ElfError::UnsupportedEncoding(1)));
    }

    #[test]
    fn reject_wrong_machine() {
        let mut buf = make_elf_header();
        put_u16(&mut buf, 18, 62); // EM_X86_64
        assert_eq!(Header::parse(&buf), Err(ElfError::UnsupportedMachine(62)));
    }

    #[test]
    fn reject_wrong_ident_version() {
        let mut buf = make_elf_header();
        buf[6] = 2;
        assert_eq!(Header::parse(&buf), Err(ElfError::UnsupportedVersion(2)));
    }

    #[test]
    fn reject_truncated() {
        assert_eq!(Header::parse(&[]), Err(ElfError::Truncated));
        assert_eq!(Header::parse(&[0u8; 32]), Err(ElfError::Truncated));
    }

    #[test]
    fn reject_shdr_table_out_of_bounds() {
        let mut buf = make_elf_header();
        // Claim one section header but provide no bytes for it
        put_u32(&mut buf, 32, ELF32_EHDR_SIZE as u32);
        put_u16(&mut buf, 48, 1);
        assert_eq!(Header::parse(&buf), Err(ElfError::InvalidOffset));
    }

    #[test]
    fn round_trip() {
        let buf = make_elf_header();
        let hdr = Header::parse(&buf).expect("valid header");
        assert_eq!(hdr.to_bytes().as_slice(), buf.as_slice());
    }

    #[test]
    fn abi_spans_two_ident_bytes() {
        let mut buf = make_elf_header();
        buf[7] = 0xCA;
        buf[8] = 0xFE;
        let hdr = Header::parse(&buf).expect("valid header");
        assert_eq!(hdr.abi, EABI_CAFE);
        let out = hdr.to_bytes();
        assert_eq!(out[7], 0xCA);
        assert_eq!(out[8], 0xFE);
    }

    #[test]
    fn display_errors() {
        let cases = [
            ElfError::BadMagic([0, 0, 0, 0]),
            ElfError::UnsupportedClass(2),
            ElfError::UnsupportedEncoding(1),
            ElfError::UnsupportedMachine(62),
            ElfError::UnsupportedVersion(0),
            ElfError::Truncated,
            ElfError::InvalidOffset,
            ElfError::BadSectionName { index: 3 },
        ];
        for err in &cases {
            assert!(!format!("{err}").is_empty());
        }
    }

    #[test]
    fn validation_errors_name_observed_value() {
        assert!(format!("{}", ElfError::UnsupportedMachine(62)).contains("62"));
        assert!(format!("{}", ElfError::UnsupportedClass(2)).contains('2'));
    }
}

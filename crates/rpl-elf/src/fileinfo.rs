//! The RPL file info record.
//!
//! A fixed 0x60-byte metadata record appended to every RPL/RPX as the
//! final section. All fields are big-endian; `compression_level` is the
//! single signed field.

use crate::header::{be_u16, be_u32, put_u16, put_u32};

/// Magic/version value of the file info record.
pub const RPL_FILEINFO_VERSION: u32 = 0xCAFE_0402;

/// File info flag: the file is an RPX executable (not an RPL library).
pub const RPL_IS_RPX: u32 = 0x2;

/// Size of the encoded record (0x60 bytes).
pub const RPL_FILEINFO_SIZE: usize = 0x60;

/// RPL file info record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RplFileInfo {
    /// Record magic/version (`RPL_FILEINFO_VERSION`).
    pub version: u32,
    /// Code segment size, rounded up to `text_align`.
    pub text_size: u32,
    /// Code segment alignment.
    pub text_align: u32,
    /// Data segment size, rounded up to `data_align`.
    pub data_size: u32,
    /// Data segment alignment.
    pub data_align: u32,
    /// Loader segment size, rounded up to `load_align`.
    pub load_size: u32,
    /// Loader segment alignment.
    pub load_align: u32,
    /// Scratch space the loader reserves for sections without a final
    /// virtual address.
    pub temp_size: u32,
    /// Trampoline adjustment.
    pub tramp_adjust: u32,
    /// Small data area base pointer.
    pub sda_base: u32,
    /// Second small data area base pointer.
    pub sda2_base: u32,
    /// Stack size for the main thread.
    pub stack_size: u32,
    /// String table offset of the module filename.
    pub filename: u32,
    /// Record flags (`RPL_IS_RPX`).
    pub flags: u32,
    /// Default heap size.
    pub heap_size: u32,
    /// Offset of the tag string.
    pub tag_offset: u32,
    /// Minimum loader version.
    pub min_version: u32,
    /// Compression level used for deflated sections, or -1.
    pub compression_level: i32,
    /// Trampoline addition.
    pub tramp_addition: u32,
    /// Padding.
    pub file_info_pad: u32,
    /// SDK version the module was built against.
    pub cafe_sdk_version: u32,
    /// SDK revision the module was built against.
    pub cafe_sdk_revision: u32,
    /// TLS module index.
    pub tls_module_index: u16,
    /// TLS alignment shift.
    pub tls_align_shift: u16,
    /// Size of the runtime-resident part of the file info.
    pub runtime_file_info_size: u32,
}

impl RplFileInfo {
    /// Size of the encoded record in bytes.
    pub const SIZE: usize = RPL_FILEINFO_SIZE;

    /// Parse a record from raw bytes at the given offset.
    ///
    /// The caller must ensure `offset + Self::SIZE <= data.len()`.
    #[must_use]
    pub fn parse(data: &[u8], offset: usize) -> Self {
        let b = &data[offset..];
        Self {
            version: be_u32(b, 0x00),
            text_size: be_u32(b, 0x04),
            text_align: be_u32(b, 0x08),
            data_size: be_u32(b, 0x0C),
            data_align: be_u32(b, 0x10),
            load_size: be_u32(b, 0x14),
            load_align: be_u32(b, 0x18),
            temp_size: be_u32(b, 0x1C),
            tramp_adjust: be_u32(b, 0x20),
            sda_base: be_u32(b, 0x24),
            sda2_base: be_u32(b, 0x28),
            stack_size: be_u32(b, 0x2C),
            filename: be_u32(b, 0x30),
            flags: be_u32(b, 0x34),
            heap_size: be_u32(b, 0x38),
            tag_offset: be_u32(b, 0x3C),
            min_version: be_u32(b, 0x40),
            compression_level: be_u32(b, 0x44) as i32,
            tramp_addition: be_u32(b, 0x48),
            file_info_pad: be_u32(b, 0x4C),
            cafe_sdk_version: be_u32(b, 0x50),
            cafe_sdk_revision: be_u32(b, 0x54),
            tls_module_index: be_u16(b, 0x58),
            tls_align_shift: be_u16(b, 0x5A),
            runtime_file_info_size: be_u32(b, 0x5C),
        }
    }

    /// Encode the record as 0x60 big-endian bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u32(&mut b, 0x00, self.version);
        put_u32(&mut b, 0x04, self.text_size);
        put_u32(&mut b, 0x08, self.text_align);
        put_u32(&mut b, 0x0C, self.data_size);
        put_u32(&mut b, 0x10, self.data_align);
        put_u32(&mut b, 0x14, self.load_size);
        put_u32(&mut b, 0x18, self.load_align);
        put_u32(&mut b, 0x1C, self.temp_size);
        put_u32(&mut b, 0x20, self.tramp_adjust);
        put_u32(&mut b, 0x24, self.sda_base);
        put_u32(&mut b, 0x28, self.sda2_base);
        put_u32(&mut b, 0x2C, self.stack_size);
        put_u32(&mut b, 0x30, self.filename);
        put_u32(&mut b, 0x34, self.flags);
        put_u32(&mut b, 0x38, self.heap_size);
        put_u32(&mut b, 0x3C, self.tag_offset);
        put_u32(&mut b, 0x40, self.min_version);
        put_u32(&mut b, 0x44, self.compression_level as u32);
        put_u32(&mut b, 0x48, self.tramp_addition);
        put_u32(&mut b, 0x4C, self.file_info_pad);
        put_u32(&mut b, 0x50, self.cafe_sdk_version);
        put_u32(&mut b, 0x54, self.cafe_sdk_revision);
        put_u16(&mut b, 0x58, self.tls_module_index);
        put_u16(&mut b, 0x5A, self.tls_align_shift);
        put_u32(&mut b, 0x5C, self.runtime_file_info_size);
        b
    }
}

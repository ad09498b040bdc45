//! Type definitions for ISZ format parsing

use serde::Serialize;

// =============================================================================
// Core Constants
// =============================================================================

pub(crate) const ISZ_SIGNATURE: &[u8; 4] = b"IsZ!";
pub(crate) const ISZ_VERSION: u8 = 1;
/// Fixed size of the file header; sibling segment files reserve the same
/// leading bytes, so cross-segment reads resume at this offset.
pub(crate) const HEADER_LEN: usize = 64;
pub(crate) const SEGMENT_RECORD_LEN: usize = 24;
/// The only pointer packing in circulation: 3 bytes per block
pub(crate) const POINTER_WIDTH: u8 = 3;
/// Low 22 bits of a packed pointer carry the size, top 2 bits the method
pub(crate) const POINTER_SIZE_MASK: u32 = 0x3F_FFFF;
pub(crate) const POINTER_METHOD_SHIFT: u32 = 22;

// =============================================================================
// Header - fixed 64-byte record at the start of every segment file
// =============================================================================

/// Parsed file header
///
/// All integers little-endian, no padding; decoded field by field from the
/// raw 64 bytes rather than through struct layout.
#[derive(Clone, Debug)]
pub struct Header {
    pub header_size: u8,
    pub version: u8,
    pub volume_serial: u32,
    pub sector_size: u16,
    pub total_sectors: u32,
    pub encryption_type: u8,
    pub segment_size: i64,
    pub block_count: u32,
    pub block_size: u32,
    pub pointer_width: u8,
    /// Which segment of a set this file is; only 0 may be opened directly
    pub segment_index: i8,
    pub chunk_pointers_offset: u32,
    pub segment_pointers_offset: u32,
    pub data_offset: u32,
    pub reserved: u8,
    /// CRC32 complement over the reconstructed uncompressed image
    pub checksum_uncompressed: u32,
    /// Total compressed payload size; the whole payload when the pointer
    /// table is absent
    pub compressed_size: u32,
    pub unused: u32,
    /// CRC32 complement over the stored compressed bytes
    pub checksum_compressed: u32,
}

impl Header {
    pub fn uncompressed_size(&self) -> u64 {
        self.sector_size as u64 * self.total_sectors as u64
    }

    pub fn encryption(&self) -> EncryptionType {
        EncryptionType::from_code(self.encryption_type)
    }
}

/// Encryption type codes from the header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionType {
    None,
    Password,
    Aes128,
    Aes192,
    Aes256,
    Unknown(u8),
}

impl EncryptionType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EncryptionType::None,
            1 => EncryptionType::Password,
            2 => EncryptionType::Aes128,
            3 => EncryptionType::Aes192,
            4 => EncryptionType::Aes256,
            other => EncryptionType::Unknown(other),
        }
    }

    pub fn label(&self) -> String {
        match self {
            EncryptionType::None => "No password".to_string(),
            EncryptionType::Password => "Password protected".to_string(),
            EncryptionType::Aes128 => "Encrypted AES128".to_string(),
            EncryptionType::Aes192 => "Encrypted AES192".to_string(),
            EncryptionType::Aes256 => "Encrypted AES256".to_string(),
            EncryptionType::Unknown(code) => format!("Unknown encryption (code {})", code),
        }
    }
}

// =============================================================================
// Segment Descriptor - one entry per physical file in the set
// =============================================================================

/// One entry of the segment table (24 bytes on disk, obfuscated)
#[derive(Clone, Debug)]
pub(crate) struct SegmentDescriptor {
    /// Byte size of this segment's data region; a stored record of size 0
    /// terminates the table
    pub size: i64,
    /// Number of blocks whose data starts in this segment
    pub chunk_count: u32,
    /// Index of the first such block
    pub first_chunk: u32,
    /// Offset within the segment file where block data begins
    pub data_offset: u32,
    /// Bytes of this segment's last block that live at the start of the next
    /// segment file
    pub leftover: u32,
}

impl SegmentDescriptor {
    pub fn contains(&self, block_id: u32) -> bool {
        block_id >= self.first_chunk && block_id - self.first_chunk < self.chunk_count
    }

    /// Index of the last block starting in this segment
    pub fn last_chunk(&self) -> u32 {
        self.first_chunk + self.chunk_count - 1
    }
}

// =============================================================================
// Chunk Pointer - one entry per logical block
// =============================================================================

/// Storage method tag from the top 2 bits of a packed pointer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMethod {
    Zeros,
    Data,
    Zlib,
    Bzip2,
}

impl StorageMethod {
    /// Decode the 2-bit method tag; the mask guarantees every value maps
    pub(crate) fn from_tag(tag: u32) -> Self {
        match tag & 0x3 {
            0 => StorageMethod::Zeros,
            1 => StorageMethod::Data,
            2 => StorageMethod::Zlib,
            _ => StorageMethod::Bzip2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageMethod::Zeros => "Zeros",
            StorageMethod::Data => "Data",
            StorageMethod::Zlib => "Zlib",
            StorageMethod::Bzip2 => "BZIP2",
        }
    }
}

/// One decoded chunk pointer
///
/// For `Zeros` the size is the uncompressed run length; for every other
/// method it is the compressed byte length on disk.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPointer {
    pub method: StorageMethod,
    pub size: u32,
}

// =============================================================================
// Public API Types
// =============================================================================

/// Container summary returned by `info`
#[derive(Serialize, Debug)]
pub struct IszInfo {
    pub version: u8,
    pub encryption: String,
    pub volume_serial: String,
    pub sector_size: u16,
    pub total_sectors: u32,
    pub uncompressed_size: u64,
    pub block_size: u32,
    pub block_count: u32,
    pub segment_count: usize,
    pub segment_files: Option<Vec<String>>,
}

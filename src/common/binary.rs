// Little-endian binary decoding and file reading utilities
//
// The ISZ metadata tables are read into byte buffers first (they have to be
// de-obfuscated before interpretation), so most decoding happens on slices
// at explicit offsets rather than straight off a reader.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

// =============================================================================
// Buffer Decoding (explicit offset, little-endian)
// =============================================================================

/// Decode u16 little-endian at the given offset
pub fn u16_at(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

/// Decode u32 little-endian at the given offset
pub fn u32_at(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

/// Decode i64 little-endian at the given offset
pub fn i64_at(buf: &[u8], off: usize) -> i64 {
    i64::from_le_bytes([
        buf[off],
        buf[off + 1],
        buf[off + 2],
        buf[off + 3],
        buf[off + 4],
        buf[off + 5],
        buf[off + 6],
        buf[off + 7],
    ])
}

// =============================================================================
// File Reading
// =============================================================================

/// Read exactly `length` bytes at the given file offset
pub fn read_bytes_at(file: &mut File, offset: u64, length: usize) -> io::Result<Vec<u8>> {
    if length == 0 {
        return Ok(Vec::new());
    }
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; length];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read up to `length` bytes at the given file offset
///
/// Stops at end of file without erroring; the caller length-checks the
/// result. Block reads need this because a truncated segment must surface as
/// a short read, not an I/O error.
pub fn read_up_to_at(file: &mut File, offset: u64, length: u64) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(length as usize);
    file.take(length).read_to_end(&mut buf)?;
    Ok(buf)
}

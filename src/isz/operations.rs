//! Public API for ISZ container operations
//!
//! The drivers iterate every block in order and fold a running CRC32; the
//! format's checksums are the bitwise complement of the final accumulator,
//! continued across blocks rather than combined per block. None of the
//! operations print anything — presentation belongs to the caller.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, instrument, trace};

use super::error::{IszError, IszResult};
use super::handle::IszHandle;
use super::types::{IszInfo, StorageMethod, ISZ_SIGNATURE};

// =============================================================================
// Info Operations
// =============================================================================

/// Summarize an ISZ container; works on encrypted containers too
#[instrument]
pub fn info(path: &str) -> IszResult<IszInfo> {
    let handle = IszHandle::open(path)?;
    let header = handle.header();

    let segment_files = if handle.segment_count() > 1 {
        Some(handle.segment_paths())
    } else {
        None
    };

    Ok(IszInfo {
        version: header.version,
        encryption: header.encryption().label(),
        volume_serial: format!("{:#010x}", header.volume_serial),
        sector_size: header.sector_size,
        total_sectors: header.total_sectors,
        uncompressed_size: header.uncompressed_size(),
        block_size: header.block_size,
        block_count: header.block_count,
        segment_count: handle.segment_count(),
        segment_files,
    })
}

/// Check if a file carries the ISZ signature
pub fn is_isz(path: &str) -> IszResult<bool> {
    if !Path::new(path).exists() {
        return Ok(false);
    }
    let mut file = File::open(path)?;
    let mut sig = [0u8; 4];
    if file.read_exact(&mut sig).is_err() {
        return Ok(false);
    }
    Ok(&sig == ISZ_SIGNATURE)
}

// =============================================================================
// Verification
// =============================================================================

/// Verify the CRC of the stored compressed data
pub fn verify_compressed(handle: &mut IszHandle) -> IszResult<bool> {
    verify_compressed_with_progress(handle, |_, _| {})
}

/// Verify the compressed-data CRC, reporting (blocks done, blocks total)
pub fn verify_compressed_with_progress<F>(
    handle: &mut IszHandle,
    mut progress: F,
) -> IszResult<bool>
where
    F: FnMut(usize, usize),
{
    handle.ensure_decodable()?;
    let total = handle.block_count();
    let mut hasher = crc32fast::Hasher::new();

    for block_id in 0..total {
        let pointer = handle.pointers[block_id];
        // Zeros blocks store no bytes; only real payloads are checksummed
        if pointer.method != StorageMethod::Zeros {
            let data = handle.read_block(block_id)?;
            hasher.update(&data);
        }
        progress(block_id + 1, total);
    }

    let crc = !hasher.finalize();
    let ok = crc == handle.header.checksum_compressed;
    debug!(
        crc = format!("{:08x}", crc),
        expected = format!("{:08x}", handle.header.checksum_compressed),
        ok,
        "compressed data verified"
    );
    Ok(ok)
}

/// Decompress every block and verify the CRC of the reconstructed image
pub fn verify_uncompressed(handle: &mut IszHandle) -> IszResult<bool> {
    verify_uncompressed_with_progress(handle, |_, _| {})
}

/// Verify the uncompressed-image CRC, reporting (blocks done, blocks total)
pub fn verify_uncompressed_with_progress<F>(
    handle: &mut IszHandle,
    mut progress: F,
) -> IszResult<bool>
where
    F: FnMut(usize, usize),
{
    handle.ensure_decodable()?;
    let total = handle.block_count();
    let mut hasher = crc32fast::Hasher::new();

    for block_id in 0..total {
        // unlike the offset bookkeeping, Zeros blocks do contribute their
        // zero bytes to the image checksum
        let data = handle.decompress_block(block_id)?;
        hasher.update(&data);
        progress(block_id + 1, total);
    }

    let crc = !hasher.finalize();
    let ok = crc == handle.header.checksum_uncompressed;
    debug!(
        crc = format!("{:08x}", crc),
        expected = format!("{:08x}", handle.header.checksum_uncompressed),
        ok,
        "uncompressed image verified"
    );
    Ok(ok)
}

// =============================================================================
// Extraction
// =============================================================================

/// Reconstruct the raw image at `dest`
pub fn extract(handle: &mut IszHandle, dest: &str) -> IszResult<()> {
    extract_with_progress(handle, dest, |_, _| {})
}

/// Reconstruct the raw image, reporting (blocks done, blocks total)
///
/// Not atomic: on a CRC mismatch the destination keeps whatever was written.
pub fn extract_with_progress<F>(handle: &mut IszHandle, dest: &str, mut progress: F) -> IszResult<()>
where
    F: FnMut(usize, usize),
{
    handle.ensure_decodable()?;
    let mut output = File::create(dest)?;
    let total = handle.block_count();
    let mut hasher = crc32fast::Hasher::new();

    debug!(dest, blocks = total, "extracting image");
    for block_id in 0..total {
        let data = handle.decompress_block(block_id)?;
        output.write_all(&data)?;
        hasher.update(&data);
        trace!(block_id, bytes = data.len(), "block extracted");
        progress(block_id + 1, total);
    }

    let crc = !hasher.finalize();
    if crc != handle.header.checksum_uncompressed {
        return Err(IszError::Integrity(format!(
            "CRC mismatch on extraction: computed {:08x}, header says {:08x}",
            crc, handle.header.checksum_uncompressed
        )));
    }
    Ok(())
}

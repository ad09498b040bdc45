//! Header and metadata table parsing
//!
//! Every structure is decoded from a raw byte buffer with an explicit
//! offset/width per field; nothing relies on compiler struct layout. The two
//! metadata tables are de-obfuscated before interpretation — the chunk
//! pointer table as one buffer, the segment table record by record.

use std::fs::File;
use std::io::{self, Read};

use tracing::{debug, trace};

use super::error::{IszError, IszResult};
use super::obfuscate::deobfuscate;
use super::types::{
    ChunkPointer, Header, SegmentDescriptor, StorageMethod, HEADER_LEN, ISZ_SIGNATURE,
    ISZ_VERSION, POINTER_METHOD_SHIFT, POINTER_SIZE_MASK, POINTER_WIDTH, SEGMENT_RECORD_LEN,
};
use crate::common::binary::{i64_at, read_bytes_at, u16_at, u32_at};

/// Upper bound on stored segment records; a table this long is corrupt
const MAX_SEGMENTS: usize = 1024;

// =============================================================================
// Header
// =============================================================================

/// Read and decode the 64-byte header at the reader's current position
pub(crate) fn read_header(file: &mut File) -> IszResult<Header> {
    let mut buf = [0u8; HEADER_LEN];
    let mut got = 0;
    while got < HEADER_LEN {
        let n = file.read(&mut buf[got..])?;
        if n == 0 {
            break;
        }
        got += n;
    }
    if got != HEADER_LEN {
        return Err(IszError::Format(format!(
            "short header, got {} of {} bytes",
            got, HEADER_LEN
        )));
    }
    parse_header(&buf)
}

/// Decode the fixed header record
pub(crate) fn parse_header(buf: &[u8; HEADER_LEN]) -> IszResult<Header> {
    if &buf[0..4] != ISZ_SIGNATURE {
        return Err(IszError::Format(
            "not an ISZ file (invalid signature)".to_string(),
        ));
    }

    let header = Header {
        header_size: buf[4],
        version: buf[5],
        volume_serial: u32_at(buf, 6),
        sector_size: u16_at(buf, 10),
        total_sectors: u32_at(buf, 12),
        encryption_type: buf[16],
        segment_size: i64_at(buf, 17),
        block_count: u32_at(buf, 25),
        block_size: u32_at(buf, 29),
        pointer_width: buf[33],
        segment_index: buf[34] as i8,
        chunk_pointers_offset: u32_at(buf, 35),
        segment_pointers_offset: u32_at(buf, 39),
        data_offset: u32_at(buf, 43),
        reserved: buf[47],
        checksum_uncompressed: u32_at(buf, 48),
        compressed_size: u32_at(buf, 52),
        unused: u32_at(buf, 56),
        checksum_compressed: u32_at(buf, 60),
    };

    if header.version != ISZ_VERSION {
        return Err(IszError::Format(format!(
            "unsupported ISZ version {}",
            header.version
        )));
    }

    Ok(header)
}

// =============================================================================
// Segment Table
// =============================================================================

/// Decode one de-obfuscated 24-byte segment record
fn parse_segment_record(buf: &[u8]) -> SegmentDescriptor {
    SegmentDescriptor {
        size: i64_at(buf, 0),
        chunk_count: u32_at(buf, 8),
        first_chunk: u32_at(buf, 12),
        data_offset: u32_at(buf, 16),
        leftover: u32_at(buf, 20),
    }
}

/// Read the segment table, or synthesize the single-segment default
///
/// A container without a stored table (`segment_pointers_offset == 0`) is a
/// single file holding every block starting at the header's data offset.
pub(crate) fn read_segment_table(
    file: &mut File,
    header: &Header,
) -> IszResult<Vec<SegmentDescriptor>> {
    if header.segment_pointers_offset == 0 {
        trace!("no segment table, synthesizing single-segment descriptor");
        return Ok(vec![SegmentDescriptor {
            size: 0,
            chunk_count: header.block_count,
            first_chunk: 0,
            data_offset: header.data_offset,
            leftover: 0,
        }]);
    }

    let mut segments = Vec::new();
    let mut offset = header.segment_pointers_offset as u64;
    loop {
        if segments.len() >= MAX_SEGMENTS {
            return Err(IszError::Format(format!(
                "segment table exceeds {} records",
                MAX_SEGMENTS
            )));
        }
        let mut record = read_bytes_at(file, offset, SEGMENT_RECORD_LEN).map_err(table_error(
            "segment table truncated before its terminating record",
        ))?;
        deobfuscate(&mut record);
        let segment = parse_segment_record(&record);
        if segment.size == 0 {
            break;
        }
        trace!(
            index = segments.len(),
            size = segment.size,
            first_chunk = segment.first_chunk,
            chunk_count = segment.chunk_count,
            leftover = segment.leftover,
            "segment record"
        );
        segments.push(segment);
        offset += SEGMENT_RECORD_LEN as u64;
    }

    debug!(segment_count = segments.len(), "segment table parsed");
    Ok(segments)
}

// =============================================================================
// Chunk Pointer Table
// =============================================================================

/// Read the chunk pointer table, or synthesize the single-chunk default
///
/// A container without a stored table (`chunk_pointers_offset == 0`) holds
/// one uncompressed run covering the whole compressed payload.
pub(crate) fn read_chunk_pointers(
    file: &mut File,
    header: &Header,
) -> IszResult<Vec<ChunkPointer>> {
    if header.chunk_pointers_offset == 0 {
        trace!("no chunk pointer table, synthesizing single data pointer");
        return Ok(vec![ChunkPointer {
            method: StorageMethod::Data,
            size: header.compressed_size,
        }]);
    }

    if header.pointer_width != POINTER_WIDTH {
        return Err(IszError::Format(format!(
            "unsupported pointer width {} (only {} implemented)",
            header.pointer_width, POINTER_WIDTH
        )));
    }

    let table_len = POINTER_WIDTH as usize * header.block_count as usize;
    let mut table = read_bytes_at(file, header.chunk_pointers_offset as u64, table_len)
        .map_err(table_error("chunk pointer table truncated"))?;
    deobfuscate(&mut table);

    let mut pointers = Vec::with_capacity(header.block_count as usize);
    for chunk in table.chunks_exact(POINTER_WIDTH as usize) {
        let value = chunk[0] as u32 | (chunk[1] as u32) << 8 | (chunk[2] as u32) << 16;
        pointers.push(ChunkPointer {
            method: StorageMethod::from_tag(value >> POINTER_METHOD_SHIFT),
            size: value & POINTER_SIZE_MASK,
        });
    }

    debug!(block_count = pointers.len(), "chunk pointer table parsed");
    Ok(pointers)
}

/// Map an unexpected end-of-file to a format error; a table running off the
/// end of the file is corruption, not an I/O failure
fn table_error(context: &'static str) -> impl Fn(io::Error) -> IszError {
    move |err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            IszError::Format(context.to_string())
        } else {
            IszError::Io(err)
        }
    }
}

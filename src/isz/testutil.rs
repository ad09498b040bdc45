//! Test fixtures: synthetic ISZ containers built on disk
//!
//! The builders lay files out exactly the way the format describes them:
//! header, obfuscated chunk pointer table, obfuscated segment table (for
//! multi-part sets), then the concatenated block payloads. Checksums are the
//! CRC32 complements over the stored and reconstructed streams.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::obfuscate::deobfuscate;
use super::types::{
    Header, HEADER_LEN, ISZ_VERSION, POINTER_METHOD_SHIFT, POINTER_WIDTH, SEGMENT_RECORD_LEN,
};

/// One logical block of a fixture container
pub(crate) enum FixtureBlock {
    /// Run of zero bytes; occupies no space on disk
    Zeros(u32),
    /// Stored verbatim
    Data(Vec<u8>),
    /// Uncompressed content, zlib-deflated by the builder
    Zlib(Vec<u8>),
    /// Uncompressed content, bzip2-compressed with its magic clobbered the
    /// way real containers store it
    Bzip2(Vec<u8>),
}

impl FixtureBlock {
    pub fn uncompressed(&self) -> Vec<u8> {
        match self {
            FixtureBlock::Zeros(n) => vec![0u8; *n as usize],
            FixtureBlock::Data(d) => d.clone(),
            FixtureBlock::Zlib(d) | FixtureBlock::Bzip2(d) => d.clone(),
        }
    }

    /// Bytes as they appear in the container's data region
    pub fn stored(&self) -> Vec<u8> {
        match self {
            FixtureBlock::Zeros(_) => Vec::new(),
            FixtureBlock::Data(d) => d.clone(),
            FixtureBlock::Zlib(d) => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(d).unwrap();
                encoder.finish().unwrap()
            }
            FixtureBlock::Bzip2(d) => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(d).unwrap();
                let mut out = encoder.finish().unwrap();
                out[0] = 0x5c;
                out[1] = 0xa9;
                out[2] = 0x13;
                out
            }
        }
    }

    fn method_tag(&self) -> u32 {
        match self {
            FixtureBlock::Zeros(_) => 0,
            FixtureBlock::Data(_) => 1,
            FixtureBlock::Zlib(_) => 2,
            FixtureBlock::Bzip2(_) => 3,
        }
    }

    /// Size as recorded in the pointer table
    fn pointer_size(&self) -> u32 {
        match self {
            FixtureBlock::Zeros(n) => *n,
            other => other.stored().len() as u32,
        }
    }
}

/// Encode a header back to its 64-byte on-disk form
pub(crate) fn encode_header(header: &Header) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[0..4].copy_from_slice(b"IsZ!");
    buf[4] = header.header_size;
    buf[5] = header.version;
    buf[6..10].copy_from_slice(&header.volume_serial.to_le_bytes());
    buf[10..12].copy_from_slice(&header.sector_size.to_le_bytes());
    buf[12..16].copy_from_slice(&header.total_sectors.to_le_bytes());
    buf[16] = header.encryption_type;
    buf[17..25].copy_from_slice(&header.segment_size.to_le_bytes());
    buf[25..29].copy_from_slice(&header.block_count.to_le_bytes());
    buf[29..33].copy_from_slice(&header.block_size.to_le_bytes());
    buf[33] = header.pointer_width;
    buf[34] = header.segment_index as u8;
    buf[35..39].copy_from_slice(&header.chunk_pointers_offset.to_le_bytes());
    buf[39..43].copy_from_slice(&header.segment_pointers_offset.to_le_bytes());
    buf[43..47].copy_from_slice(&header.data_offset.to_le_bytes());
    buf[47] = header.reserved;
    buf[48..52].copy_from_slice(&header.checksum_uncompressed.to_le_bytes());
    buf[52..56].copy_from_slice(&header.compressed_size.to_le_bytes());
    buf[56..60].copy_from_slice(&header.unused.to_le_bytes());
    buf[60..64].copy_from_slice(&header.checksum_compressed.to_le_bytes());
    buf
}

fn crc_complement(streams: &[Vec<u8>]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for stream in streams {
        hasher.update(stream);
    }
    !hasher.finalize()
}

fn packed_pointer_table(blocks: &[FixtureBlock]) -> Vec<u8> {
    let mut table = Vec::with_capacity(blocks.len() * POINTER_WIDTH as usize);
    for block in blocks {
        let value = (block.method_tag() << POINTER_METHOD_SHIFT) | block.pointer_size();
        table.extend_from_slice(&value.to_le_bytes()[..3]);
    }
    deobfuscate(&mut table);
    table
}

fn obfuscated_segment_record(
    size: i64,
    chunk_count: u32,
    first_chunk: u32,
    data_offset: u32,
    leftover: u32,
) -> Vec<u8> {
    let mut raw = Vec::with_capacity(SEGMENT_RECORD_LEN);
    raw.extend_from_slice(&size.to_le_bytes());
    raw.extend_from_slice(&chunk_count.to_le_bytes());
    raw.extend_from_slice(&first_chunk.to_le_bytes());
    raw.extend_from_slice(&data_offset.to_le_bytes());
    raw.extend_from_slice(&leftover.to_le_bytes());
    deobfuscate(&mut raw);
    raw
}

fn base_header(blocks: &[FixtureBlock], encryption_type: u8) -> Header {
    let uncompressed: Vec<Vec<u8>> = blocks.iter().map(|b| b.uncompressed()).collect();
    let stored: Vec<Vec<u8>> = blocks.iter().map(|b| b.stored()).collect();
    let total_uncompressed: usize = uncompressed.iter().map(|b| b.len()).sum();
    let total_stored: usize = stored.iter().map(|b| b.len()).sum();
    let block_size = uncompressed.iter().map(|b| b.len()).max().unwrap_or(0) as u32;

    Header {
        header_size: HEADER_LEN as u8,
        version: ISZ_VERSION,
        volume_serial: 0x0BAD_CAFE,
        sector_size: 512,
        total_sectors: (total_uncompressed / 512) as u32,
        encryption_type,
        segment_size: 0,
        block_count: blocks.len() as u32,
        block_size,
        pointer_width: POINTER_WIDTH,
        segment_index: 0,
        chunk_pointers_offset: 0,
        segment_pointers_offset: 0,
        data_offset: 0,
        reserved: 0,
        checksum_uncompressed: crc_complement(&uncompressed),
        compressed_size: total_stored as u32,
        unused: 0,
        checksum_compressed: crc_complement(&stored),
    }
}

/// Build a single-file container with a stored chunk pointer table
pub(crate) fn build_container(dir: &Path, name: &str, blocks: &[FixtureBlock]) -> PathBuf {
    build_container_with_encryption(dir, name, blocks, 0)
}

pub(crate) fn build_container_with_encryption(
    dir: &Path,
    name: &str,
    blocks: &[FixtureBlock],
    encryption_type: u8,
) -> PathBuf {
    let table = packed_pointer_table(blocks);
    let mut header = base_header(blocks, encryption_type);
    header.chunk_pointers_offset = HEADER_LEN as u32;
    header.data_offset = (HEADER_LEN + table.len()) as u32;

    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(&encode_header(&header)).unwrap();
    file.write_all(&table).unwrap();
    for block in blocks {
        file.write_all(&block.stored()).unwrap();
    }
    path
}

/// Build a container without metadata tables: one raw chunk, one segment
pub(crate) fn build_raw_container(dir: &Path, name: &str, payload: &[u8]) -> PathBuf {
    let blocks = [FixtureBlock::Data(payload.to_vec())];
    let mut header = base_header(&blocks, 0);
    header.data_offset = HEADER_LEN as u32;

    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(&encode_header(&header)).unwrap();
    file.write_all(payload).unwrap();
    path
}

/// Build a two-file set splitting the stored stream after `seg0_data_len`
/// bytes; the straddling block's tail lands at byte 64 of the second file
///
/// Panics if the split point does not fall strictly inside the stream.
pub(crate) fn build_split_container(
    dir: &Path,
    seg0_name: &str,
    seg1_name: &str,
    blocks: &[FixtureBlock],
    seg0_data_len: usize,
) -> PathBuf {
    let stored: Vec<Vec<u8>> = blocks.iter().map(|b| b.stored()).collect();
    let total_stored: usize = stored.iter().map(|b| b.len()).sum();
    assert!(seg0_data_len > 0 && seg0_data_len < total_stored);

    // assign blocks to segments; the block whose bytes straddle the split
    // still belongs to the first segment, with its tail as leftover
    let mut seg0_chunks = 0usize;
    let mut leftover = 0usize;
    let mut cursor = 0usize;
    for bytes in &stored {
        if cursor >= seg0_data_len {
            break;
        }
        seg0_chunks += 1;
        cursor += bytes.len();
        if cursor > seg0_data_len {
            leftover = cursor - seg0_data_len;
            break;
        }
    }
    let seg1_chunks = blocks.len() - seg0_chunks;
    assert!(seg1_chunks > 0, "split must leave blocks in the second segment");

    let table = packed_pointer_table(blocks);
    let seg_table_offset = HEADER_LEN + table.len();
    let data_offset = seg_table_offset + SEGMENT_RECORD_LEN * 3;

    let mut header = base_header(blocks, 0);
    header.chunk_pointers_offset = HEADER_LEN as u32;
    header.segment_pointers_offset = seg_table_offset as u32;
    header.data_offset = data_offset as u32;

    let seg1_data_len = total_stored - seg0_data_len;
    let mut segment_records = Vec::new();
    segment_records.extend_from_slice(&obfuscated_segment_record(
        seg0_data_len as i64,
        seg0_chunks as u32,
        0,
        data_offset as u32,
        leftover as u32,
    ));
    segment_records.extend_from_slice(&obfuscated_segment_record(
        seg1_data_len as i64,
        seg1_chunks as u32,
        seg0_chunks as u32,
        (HEADER_LEN + leftover) as u32,
        0,
    ));
    segment_records.extend_from_slice(&obfuscated_segment_record(0, 0, 0, 0, 0));

    let mut stream = Vec::with_capacity(total_stored);
    for bytes in &stored {
        stream.extend_from_slice(bytes);
    }

    let seg0_path = dir.join(seg0_name);
    let mut seg0 = File::create(&seg0_path).unwrap();
    seg0.write_all(&encode_header(&header)).unwrap();
    seg0.write_all(&table).unwrap();
    seg0.write_all(&segment_records).unwrap();
    seg0.write_all(&stream[..seg0_data_len]).unwrap();

    let mut seg1_header = header.clone();
    seg1_header.segment_index = 1;
    let seg1_path = dir.join(seg1_name);
    let mut seg1 = File::create(&seg1_path).unwrap();
    seg1.write_all(&encode_header(&seg1_header)).unwrap();
    seg1.write_all(&stream[seg0_data_len..]).unwrap();

    seg0_path
}

/// Flip one bit of the file at the given byte offset
pub(crate) fn flip_bit(path: &Path, offset: u64) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte).unwrap();
    byte[0] ^= 0x01;
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&byte).unwrap();
}

/// Deterministic pseudo-random content for block payloads
pub(crate) fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

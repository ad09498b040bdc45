//! IszHandle - open container handle and block-level access
//!
//! The handle owns the parsed header and tables plus lazily-opened file
//! handles for every segment of the set. Block reads resolve the owning
//! segment, accumulate the on-disk offset over the preceding blocks, and
//! stitch together blocks whose compressed bytes straddle a segment
//! boundary.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use bzip2::read::BzDecoder;
use flate2::read::ZlibDecoder;
use tracing::{debug, instrument, trace};

use super::error::{IszError, IszResult};
use super::naming::{detect_convention, verify_segment_files, NamingConvention};
use super::parser;
use super::types::{EncryptionType, Header, ChunkPointer, SegmentDescriptor, StorageMethod, HEADER_LEN};
use crate::common::binary::read_up_to_at;

#[derive(Debug)]
pub struct IszHandle {
    pub(crate) path: String,
    pub(crate) header: Header,
    pub(crate) segments: Vec<SegmentDescriptor>,
    pub(crate) pointers: Vec<ChunkPointer>,
    pub(crate) naming: NamingConvention,
    /// Lazily-opened segment files, kept for the handle's lifetime
    files: HashMap<usize, File>,
}

impl IszHandle {
    /// Open the first file of an ISZ set and parse its metadata tables
    #[instrument(skip_all, fields(path))]
    pub fn open(path: &str) -> IszResult<Self> {
        debug!(path, "opening ISZ container");
        let mut file = File::open(path)?;

        let header = parser::read_header(&mut file)?;
        if header.segment_index != 0 {
            return Err(IszError::Format(format!(
                "not the first segment of a set (segment index {})",
                header.segment_index
            )));
        }

        let segments = parser::read_segment_table(&mut file, &header)?;
        let naming = if segments.len() > 1 {
            detect_convention(path)?
        } else {
            NamingConvention::SingleFile
        };
        verify_segment_files(naming, path, segments.len())?;

        let pointers = parser::read_chunk_pointers(&mut file, &header)?;

        debug!(
            segment_count = segments.len(),
            block_count = pointers.len(),
            encryption = %header.encryption().label(),
            "container opened"
        );

        let mut files = HashMap::new();
        files.insert(0, file);

        Ok(Self {
            path: path.to_string(),
            header,
            segments,
            pointers,
            naming,
            files,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of logical blocks the traversals iterate over
    pub fn block_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// On-disk paths of every segment of the set
    pub fn segment_paths(&self) -> Vec<String> {
        (0..self.segments.len())
            .map(|seg_id| self.naming.segment_path(&self.path, seg_id))
            .collect()
    }

    /// Release all held file handles and the parsed tables
    pub fn close(mut self) {
        self.files.clear();
        self.segments.clear();
        self.pointers.clear();
    }

    /// Encrypted containers can be inspected but not decoded
    pub(crate) fn ensure_decodable(&self) -> IszResult<()> {
        if self.header.encryption() != EncryptionType::None {
            return Err(IszError::Format("encryption not supported".to_string()));
        }
        Ok(())
    }

    fn segment_file(&mut self, seg_id: usize) -> IszResult<&mut File> {
        let path = self.naming.segment_path(&self.path, seg_id);
        match self.files.entry(seg_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                trace!(seg_id, path, "opening segment file");
                let file = File::open(&path).map_err(|e| {
                    IszError::NotFound(format!("unable to open segment {} ('{}'): {}", seg_id, path, e))
                })?;
                Ok(entry.insert(file))
            }
        }
    }

    /// Locate and read the stored bytes of a block, without decompressing
    ///
    /// The on-disk offset is the segment's data start plus the stored sizes
    /// of every preceding non-Zeros block in the same segment; Zeros blocks
    /// occupy no space on disk and must not advance the offset. A block that
    /// is its segment's last may continue at byte 64 of the next segment
    /// file.
    pub fn read_block(&mut self, block_id: usize) -> IszResult<Vec<u8>> {
        self.ensure_decodable()?;

        let pointer = *self.pointers.get(block_id).ok_or_else(|| {
            IszError::NotFound(format!(
                "block {} out of range ({} blocks)",
                block_id,
                self.pointers.len()
            ))
        })?;

        let seg_id = self
            .segments
            .iter()
            .position(|seg| seg.contains(block_id as u32))
            .ok_or_else(|| IszError::NotFound(format!("no segment covers block {}", block_id)))?;
        let segment = self.segments[seg_id].clone();

        let mut offset = segment.data_offset as u64;
        for preceding in &self.pointers[segment.first_chunk as usize..block_id] {
            if preceding.method != StorageMethod::Zeros {
                offset += preceding.size as u64;
            }
        }

        let is_last = block_id as u32 == segment.last_chunk();
        let mut in_segment = pointer.size as u64;
        if is_last {
            in_segment = in_segment.saturating_sub(segment.leftover as u64);
        }

        let file = self.segment_file(seg_id)?;
        let mut data = read_up_to_at(file, offset, in_segment)?;

        // tail of a block split over the segment boundary, right after the
        // next file's own header
        if is_last && segment.leftover != 0 {
            let next = self.segment_file(seg_id + 1)?;
            let tail = read_up_to_at(next, HEADER_LEN as u64, segment.leftover as u64)?;
            data.extend_from_slice(&tail);
        }

        if data.len() != pointer.size as usize {
            return Err(IszError::Integrity(format!(
                "short read on block {}: got {} of {} bytes",
                block_id,
                data.len(),
                pointer.size
            )));
        }

        trace!(
            block_id,
            seg_id,
            offset,
            size = pointer.size,
            method = pointer.method.name(),
            "block read"
        );
        Ok(data)
    }

    /// Read a block and undo its storage method
    pub fn decompress_block(&mut self, block_id: usize) -> IszResult<Vec<u8>> {
        self.ensure_decodable()?;

        let pointer = *self.pointers.get(block_id).ok_or_else(|| {
            IszError::NotFound(format!(
                "block {} out of range ({} blocks)",
                block_id,
                self.pointers.len()
            ))
        })?;

        match pointer.method {
            StorageMethod::Zeros => Ok(vec![0u8; pointer.size as usize]),
            StorageMethod::Data => self.read_block(block_id),
            StorageMethod::Zlib => {
                let data = self.read_block(block_id)?;
                let mut decoder = ZlibDecoder::new(&data[..]);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| IszError::Decompression {
                        block: block_id,
                        source: e,
                    })?;
                Ok(out)
            }
            StorageMethod::Bzip2 => {
                let mut data = self.read_block(block_id)?;
                // the container clobbers the stream magic; restore it
                if data.len() >= 3 {
                    data[0..3].copy_from_slice(b"BZh");
                }
                let mut decoder = BzDecoder::new(&data[..]);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| IszError::Decompression {
                        block: block_id,
                        source: e,
                    })?;
                Ok(out)
            }
        }
    }
}

//! ISZ ("ISO zipped") compressed disk image container
//!
//! ISZ encapsulates a raw ISO image as a sequence of fixed-size logical
//! blocks, each stored with its own compression method, optionally split
//! across several physical files and with its metadata tables lightly
//! XOR-obfuscated.
//!
//! ## Container Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (64 bytes)                                            │
//! │  - Signature "IsZ!", version, sector geometry                │
//! │  - Encryption type, block count/size, pointer width          │
//! │  - Table offsets, data offset                                │
//! │  - CRC32 complements (compressed + uncompressed streams)     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Chunk Pointer Table (3 bytes per block, obfuscated)          │
//! │  - 24-bit value: top 2 bits method, low 22 bits size         │
//! │  - Methods: Zeros / Data / Zlib / BZIP2                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Segment Table (24 bytes per record, obfuscated, optional)    │
//! │  - One record per physical file, terminated by size == 0     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Block Data (concatenated compressed payloads)                │
//! │  - Zeros blocks occupy no space                              │
//! │  - A block may straddle into the next segment file, which    │
//! │    carries its own 64-byte header first                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Multi-Segment Sets
//!
//! Large images are split across sibling files named by one of three
//! conventions (`.i01`, `.partNN.isz`, `.partNNN.isz`); the convention is
//! detected by probing the filesystem for segment 1.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use isz_tools::isz::{self, IszHandle};
//!
//! if isz::is_isz("/images/disk.isz")? {
//!     let summary = isz::info("/images/disk.isz")?;
//!     println!("uncompressed size: {} bytes", summary.uncompressed_size);
//!
//!     let mut handle = IszHandle::open("/images/disk.isz")?;
//!     if isz::verify_compressed(&mut handle)? {
//!         isz::extract(&mut handle, "/images/disk.iso")?;
//!     }
//!     handle.close();
//! }
//! ```

mod error;
mod handle;
mod naming;
mod obfuscate;
mod operations;
mod parser;
mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export public types
pub use error::{IszError, IszResult};
pub use handle::IszHandle;
pub use types::{ChunkPointer, EncryptionType, Header, IszInfo, StorageMethod};

// Re-export public functions
pub use operations::{
    extract, extract_with_progress, info, is_isz, verify_compressed,
    verify_compressed_with_progress, verify_uncompressed, verify_uncompressed_with_progress,
};

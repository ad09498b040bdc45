//! Error types for ISZ container operations

use std::fmt;
use std::io;

/// Result type alias for ISZ operations
pub type IszResult<T> = Result<T, IszError>;

/// Errors that can occur while opening or reading an ISZ container
///
/// `Format` aborts the open (or gates operations on encrypted containers).
/// `Integrity` leaves the handle usable for other operations.
/// `Decompression` aborts the traversal that hit it.
#[derive(Debug)]
pub enum IszError {
    /// Malformed or unsupported header, segment table, or pointer table
    Format(String),
    /// Missing segment file, or a block not covered by any segment
    NotFound(String),
    /// Checksum mismatch or short read
    Integrity(String),
    /// Corrupt compressed block stream
    Decompression { block: usize, source: io::Error },
    /// Underlying I/O error
    Io(io::Error),
}

impl fmt::Display for IszError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IszError::Format(msg) => write!(f, "Format error: {}", msg),
            IszError::NotFound(msg) => write!(f, "Not found: {}", msg),
            IszError::Integrity(msg) => write!(f, "Integrity error: {}", msg),
            IszError::Decompression { block, source } => {
                write!(f, "Decompression error in block {}: {}", block, source)
            }
            IszError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for IszError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IszError::Decompression { source, .. } => Some(source),
            IszError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for IszError {
    fn from(err: io::Error) -> Self {
        IszError::Io(err)
    }
}

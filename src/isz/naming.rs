//! Segment file naming conventions for multi-part ISZ sets
//!
//! The format records how many segments exist but not what they are called.
//! Authoring tools use one of three rewrite rules to name the sibling files,
//! so the convention has to be probed on disk: generate the candidate name of
//! segment 1 under each rule and accept the first that exists.

use std::path::Path;

use tracing::{debug, trace};

use super::error::{IszError, IszResult};

/// Naming strategy resolved at open time and stored on the container handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NamingConvention {
    /// Single-file container; every index maps to the base path
    SingleFile,
    /// `disk.isz`, `disk.i01`, `disk.i02`, ...
    NumberedExtension,
    /// `disk.part01.isz`, `disk.part02.isz`, ...
    PartTwoDigits,
    /// `disk.part001.isz`, `disk.part002.isz`, ...
    PartThreeDigits,
}

impl NamingConvention {
    /// Build the on-disk path of segment `seg_id` from the base path
    pub fn segment_path(&self, base: &str, seg_id: usize) -> String {
        match self {
            NamingConvention::SingleFile => base.to_string(),
            NamingConvention::NumberedExtension => {
                if seg_id == 0 {
                    base.to_string()
                } else {
                    match strip_tail(base, 4) {
                        Some(stem) => format!("{}.i{:02}", stem, seg_id),
                        None => base.to_string(),
                    }
                }
            }
            NamingConvention::PartTwoDigits => match strip_tail(base, 11) {
                Some(stem) => format!("{}.part{:02}.isz", stem, seg_id + 1),
                None => base.to_string(),
            },
            NamingConvention::PartThreeDigits => match strip_tail(base, 12) {
                Some(stem) => format!("{}.part{:03}.isz", stem, seg_id + 1),
                None => base.to_string(),
            },
        }
    }
}

/// Drop the last `n` bytes of the path, refusing to split a UTF-8 character
fn strip_tail(base: &str, n: usize) -> Option<&str> {
    base.len().checked_sub(n).and_then(|end| base.get(..end))
}

/// Probe the filesystem for the naming convention of a multi-part set
///
/// The first file of a set must carry the `.isz` extension, otherwise no
/// rewrite rule can apply.
pub(crate) fn detect_convention(base: &str) -> IszResult<NamingConvention> {
    if !base.ends_with(".isz") {
        return Err(IszError::Format(
            "the first file of a multi-part set must have an .isz extension".to_string(),
        ));
    }

    let candidates = [
        NamingConvention::NumberedExtension,
        NamingConvention::PartTwoDigits,
        NamingConvention::PartThreeDigits,
    ];
    for convention in candidates {
        let probe = convention.segment_path(base, 1);
        trace!(?convention, probe, "probing naming convention");
        if probe != base && Path::new(&probe).exists() {
            debug!(?convention, "naming convention detected");
            return Ok(convention);
        }
    }

    Err(IszError::Format(format!(
        "unable to find the naming convention for the multi-part set of '{}'",
        base
    )))
}

/// Verify that every segment of the set is present on disk
pub(crate) fn verify_segment_files(
    convention: NamingConvention,
    base: &str,
    count: usize,
) -> IszResult<()> {
    for seg_id in 0..count {
        let path = convention.segment_path(base, seg_id);
        if !Path::new(&path).exists() {
            return Err(IszError::Format(format!(
                "missing segment {} ('{}')",
                seg_id, path
            )));
        }
    }
    Ok(())
}

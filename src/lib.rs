//! ISZ container toolkit: inspect, verify and extract `.isz` compressed ISO
//! disk images.

pub mod common;
pub mod isz;
pub mod logging;

pub use isz::{IszError, IszHandle, IszInfo, IszResult};

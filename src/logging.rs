//! Logging and tracing configuration
//!
//! Structured logging via the `tracing` crate. The CLI calls `init()` once at
//! startup; library users bring their own subscriber.
//!
//! Set `RUST_LOG` to control levels at runtime:
//! ```bash
//! RUST_LOG=debug isz-tools verify image.isz
//! RUST_LOG=isz_tools=trace isz-tools info image.isz
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging/tracing system
///
/// Call this once at application startup.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Default: info in release, debug in debug builds
        if cfg!(debug_assertions) {
            EnvFilter::new("isz_tools=debug")
        } else {
            EnvFilter::new("isz_tools=info")
        }
    });

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    // Set as global default (ignore error if already set)
    let _ = tracing::subscriber::set_global_default(subscriber);
}

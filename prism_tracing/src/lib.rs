#![deny(unused_crate_dependencies)]

pub use tracing::trace_span;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber for this process.
///
/// Reads the filter from `RUST_LOG` and falls back to `info`. Calling this
/// more than once (e.g. from multiple tests in the same process) is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

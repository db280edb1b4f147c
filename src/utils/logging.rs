//! Log filter selection for the binary.

use tracing_subscriber::EnvFilter;

/// `-v` wins over RUST_LOG; otherwise RUST_LOG, falling back to warnings only.
pub fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

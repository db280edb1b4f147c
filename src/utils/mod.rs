//! Utility functions shared across the application.

mod error;
mod logging;
pub(crate) mod permissions;

pub use error::format_error;
pub use logging::log_filter;
pub use permissions::restrict_file_permissions;

/// Placeholder printed instead of sensitive values.
pub const SENSITIVE: &str = "(sensitive)";

//! Desired-state document loading and mapping.

mod loader;
mod types;

pub use types::{ClientDecl, Defaults, Document, Entries, Entry, ProviderConfig, SecretDecl};

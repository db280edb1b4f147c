//! dsvform - declarative reconciliation of secrets and client credentials
//! against a DevOps Secrets Vault.
//!
//! This crate provides functionality to:
//! - Resolve provider settings into a validated connection descriptor
//! - Create, read, update and delete secrets and clients through a vault client
//! - Plan and apply a KDL desired-state document, tracking observed state in SQLite
//!
//! # Example
//!
//! ```no_run
//! use dsvform::{LocalConnector, ProviderSettings, SecretReconciler, SecretResource, resolve};
//! use secrecy::SecretString;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = resolve(&ProviderSettings {
//!         tenant: Some("acme".to_string()),
//!         client_id: Some("deployer".to_string()),
//!         client_secret: Some(SecretString::from("s3cret".to_string())),
//!         ..Default::default()
//!     })?;
//!
//!     let connector = LocalConnector::new("./.dsv/vault");
//!     let mut desired = SecretResource::new("apps/web/database");
//!     desired.data.insert("password".to_string(), "hunter2".into());
//!
//!     let created = SecretReconciler::new(&connector).create(&desired, &conn)?;
//!     println!("{} is at version {}", created.path, created.version);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod resource;
pub mod utils;
pub mod vault;

// Re-export commonly used types at the crate root
pub use config::Document;
pub use db::{StateStore, init_db};
pub use engine::Engine;
pub use error::{DsvError, ResourceKind, Result};
pub use resolver::{ConnectionDescriptor, ProviderSettings, resolve};
pub use resource::{ClientReconciler, ClientResource, Lookup, SecretReconciler, SecretResource};
pub use vault::{Connector, LocalConnector, VaultClient, VaultError};

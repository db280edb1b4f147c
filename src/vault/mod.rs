//! Vault client interface.
//!
//! The reconcilers only ever talk to a vault through these traits. A
//! `Connector` turns a `ConnectionDescriptor` into a live `VaultClient`; the
//! client performs one blocking round-trip per call. Authentication, retries
//! and the wire protocol belong to the implementation.

mod local;
mod schema;
mod types;

pub use local::{LocalConnector, LocalVault, endpoint, validate_path};
pub use types::{ClientCredential, Role, Secret};

use std::fmt;

use thiserror::Error;

use crate::resolver::ConnectionDescriptor;

/// Category of a vault failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Unauthorized,
    Unavailable,
    Other,
}

impl fmt::Display for VaultErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VaultErrorKind::NotFound => "not found",
            VaultErrorKind::Conflict => "conflict",
            VaultErrorKind::Invalid => "invalid request",
            VaultErrorKind::Unauthorized => "unauthorized",
            VaultErrorKind::Unavailable => "unavailable",
            VaultErrorKind::Other => "error",
        };
        f.write_str(s)
    }
}

/// An error reported by a vault client.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct VaultError {
    pub kind: VaultErrorKind,
    pub message: String,
}

impl VaultError {
    pub fn new(kind: VaultErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Conflict, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Invalid, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Unauthorized, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Unavailable, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == VaultErrorKind::NotFound
    }
}

/// Opens vault sessions for a connection descriptor.
pub trait Connector: Send + Sync {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn VaultClient>, VaultError>;
}

/// Operations a vault session exposes to the reconcilers.
pub trait VaultClient: Send + Sync {
    /// Fetch the live secret stored at `path`.
    fn get_secret(&self, path: &str) -> Result<Secret, VaultError>;

    /// Store a new secret. The identifier and version are assigned by the vault.
    fn create_secret(&self, secret: &Secret) -> Result<(), VaultError>;

    /// Overwrite description, data and attributes of the secret at `secret.path`.
    fn update_secret(&self, secret: &Secret, bump_version: bool) -> Result<(), VaultError>;

    /// Remove the secret at `path`. A soft delete keeps the path reserved.
    fn delete_secret(&self, path: &str, hard_delete: bool) -> Result<(), VaultError>;

    fn get_client(&self, client_id: &str) -> Result<ClientCredential, VaultError>;

    /// Create a client for `role`. The response is the only place the
    /// generated client secret is ever visible.
    fn create_client(
        &self,
        role: &str,
        description: Option<&str>,
    ) -> Result<ClientCredential, VaultError>;

    fn delete_client(&self, client_id: &str, hard_delete: bool) -> Result<(), VaultError>;

    fn get_role(&self, name: &str) -> Result<Role, VaultError>;
}

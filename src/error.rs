//! Unified error type for dsvform.
//!
//! All public APIs return `Result<T, DsvError>`. Reconciler failures carry the
//! resource kind, its key (path, client id or role name) and the attempted
//! action, so callers can log or alert without re-deriving context.

use std::fmt;

use thiserror::Error;

use crate::vault::VaultError;

/// The kind of vault object an operation was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Secret,
    Client,
    Role,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Secret => "secret",
            ResourceKind::Client => "client",
            ResourceKind::Role => "role",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified error type for all dsvform operations.
#[derive(Debug, Error)]
pub enum DsvError {
    // ── Configuration ──────────────────────────────────────────────────
    /// Required connection settings are missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The desired-state document could not be read or is inconsistent.
    #[error("document error: {0}")]
    Document(String),

    // ── Reconciliation ─────────────────────────────────────────────────
    /// The vault reports the object absent.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: ResourceKind, key: String },

    /// The desired state is unusable; raised before any vault call.
    #[error("invalid {kind} '{key}': {message}")]
    Precondition {
        kind: ResourceKind,
        key: String,
        message: String,
    },

    #[error("unable to create {kind} '{key}': {source}")]
    Create {
        kind: ResourceKind,
        key: String,
        #[source]
        source: VaultError,
    },

    #[error("unable to read {kind} '{key}': {source}")]
    Read {
        kind: ResourceKind,
        key: String,
        #[source]
        source: VaultError,
    },

    #[error("unable to update {kind} '{key}': {source}")]
    Update {
        kind: ResourceKind,
        key: String,
        #[source]
        source: VaultError,
    },

    #[error("unable to delete {kind} '{key}': {source}")]
    Delete {
        kind: ResourceKind,
        key: String,
        #[source]
        source: VaultError,
    },

    // ── Local persistence ──────────────────────────────────────────────
    /// SQLite / state store operation failed.
    #[error("state error: {0}")]
    State(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem or I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ── Convenience constructors ───────────────────────────────────────────

impl DsvError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        DsvError::Configuration(message.into())
    }

    /// Create a document error.
    pub fn document(message: impl Into<String>) -> Self {
        DsvError::Document(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(kind: ResourceKind, key: impl Into<String>) -> Self {
        DsvError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Create a precondition error.
    pub fn precondition(
        kind: ResourceKind,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DsvError::Precondition {
            kind,
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap a failed read, translating a vault "not found" into `NotFound`.
    pub fn read(kind: ResourceKind, key: impl Into<String>, source: VaultError) -> Self {
        let key = key.into();
        if source.is_not_found() {
            DsvError::NotFound { kind, key }
        } else {
            DsvError::Read { kind, key, source }
        }
    }

    pub fn create(kind: ResourceKind, key: impl Into<String>, source: VaultError) -> Self {
        DsvError::Create {
            kind,
            key: key.into(),
            source,
        }
    }

    pub fn update(kind: ResourceKind, key: impl Into<String>, source: VaultError) -> Self {
        DsvError::Update {
            kind,
            key: key.into(),
            source,
        }
    }

    /// Wrap a failed delete, translating a vault "not found" into `NotFound`.
    pub fn delete(kind: ResourceKind, key: impl Into<String>, source: VaultError) -> Self {
        let key = key.into();
        if source.is_not_found() {
            DsvError::NotFound { kind, key }
        } else {
            DsvError::Delete { kind, key, source }
        }
    }

    /// True when the vault reported the object absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DsvError::NotFound { .. })
    }
}

impl From<knuffel::Error> for DsvError {
    fn from(e: knuffel::Error) -> Self {
        DsvError::Document(e.to_string())
    }
}

/// Convenience type alias for Results using DsvError.
pub type Result<T> = std::result::Result<T, DsvError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::VaultErrorKind;

    #[test]
    fn test_read_maps_not_found() {
        let err = DsvError::read(
            ResourceKind::Secret,
            "app/db",
            VaultError::new(VaultErrorKind::NotFound, "no such path"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "secret 'app/db' not found");
    }

    #[test]
    fn test_read_keeps_other_failures() {
        let err = DsvError::read(
            ResourceKind::Secret,
            "app/db",
            VaultError::new(VaultErrorKind::Unavailable, "timeout"),
        );
        assert!(matches!(err, DsvError::Read { .. }));
        assert!(err.to_string().contains("unable to read secret 'app/db'"));
    }

    #[test]
    fn test_delete_maps_not_found() {
        let err = DsvError::delete(
            ResourceKind::Client,
            "c-1",
            VaultError::new(VaultErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_carries_context() {
        let err = DsvError::create(
            ResourceKind::Secret,
            "app/db",
            VaultError::new(VaultErrorKind::Conflict, "path already exists"),
        );
        let msg = err.to_string();
        assert!(msg.contains("create"));
        assert!(msg.contains("app/db"));
        assert!(msg.contains("path already exists"));
    }
}

//! Records as the vault returns them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::Value;

/// A secret stored at a path in the vault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Secret {
    pub id: String,
    pub path: String,
    pub description: String,
    pub data: BTreeMap<String, Value>,
    pub attributes: BTreeMap<String, Value>,
    pub version: i64,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Secret {
    /// A secret that has not been stored yet.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Client credentials bound to a role.
#[derive(Clone)]
pub struct ClientCredential {
    pub client_id: String,
    /// Only populated in the response to a create.
    pub client_secret: Option<SecretString>,
    pub role: String,
    pub description: String,
    pub created: Option<DateTime<Utc>>,
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .field("description", &self.description)
            .field("created", &self.created)
            .finish()
    }
}

/// A named permission set clients authenticate as.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub provider: Option<String>,
    pub external_id: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

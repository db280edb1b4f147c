//! Database model structs representing table rows.

use chrono::{DateTime, Utc};

use crate::error::ResourceKind;
use crate::resource::{ClientResource, SecretResource};

/// The last observed representation of a managed resource.
#[derive(Debug, Clone)]
pub enum StoredResource {
    Secret(SecretResource),
    Client(ClientResource),
}

impl StoredResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            StoredResource::Secret(_) => ResourceKind::Secret,
            StoredResource::Client(_) => ResourceKind::Client,
        }
    }

    /// Vault-assigned identifier.
    pub fn identifier(&self) -> &str {
        match self {
            StoredResource::Secret(s) => &s.identifier,
            StoredResource::Client(c) => &c.identifier,
        }
    }

    /// The key the resource was created under: a secret's path or a
    /// client's role.
    pub fn natural_key(&self) -> &str {
        match self {
            StoredResource::Secret(s) => &s.path,
            StoredResource::Client(c) => &c.role,
        }
    }

    /// The key used to look the resource up remotely.
    pub fn lookup_key(&self) -> &str {
        match self {
            StoredResource::Secret(s) => &s.path,
            StoredResource::Client(c) => &c.identifier,
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            StoredResource::Secret(s) => s.version,
            StoredResource::Client(_) => 0,
        }
    }
}

/// A row of the resources table.
#[derive(Debug, Clone)]
pub struct StateEntry {
    pub address: String,
    pub resource: StoredResource,
    pub updated_at: DateTime<Utc>,
}

/// A logged operation.
#[derive(Debug, Clone)]
pub struct DbOperation {
    pub id: i64,
    pub operation_type: String,
    pub address: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

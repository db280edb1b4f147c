//! Local vault - a SQLite-backed stand-in for the hosted vault.
//!
//! One database per tenant, kept under a directory or in memory. It follows
//! the hosted vault's observable rules: paths are unique (even after a soft
//! delete), identifiers are assigned on create, and the version only moves
//! when an update asks for it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::schema::init_vault_db;
use super::types::{ClientCredential, Role, Secret};
use super::{Connector, VaultClient, VaultError};
use crate::resolver::ConnectionDescriptor;
use crate::utils::restrict_file_permissions;

const DEFAULT_TLD: &str = "com";
const DEFAULT_URL_TEMPLATE: &str = "https://%s.secretsvaultcloud.%s/v1/%s%s";

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?[A-Za-z0-9_.\-]+([/:][A-Za-z0-9_.\-]+)*$").expect("valid path regex")
});

static TENANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-]*$").expect("valid tenant regex"));

/// Check a secret path: segments of letters, digits, `_`, `.` or `-`,
/// separated by `/` or `:`, with an optional leading `/`.
pub fn validate_path(path: &str) -> Result<(), VaultError> {
    if PATH_RE.is_match(path) {
        Ok(())
    } else {
        Err(VaultError::invalid(format!("invalid secret path '{}'", path)))
    }
}

/// The API endpoint a descriptor addresses, applying the vault's defaults
/// for an unset top-level domain or URL template.
pub fn endpoint(descriptor: &ConnectionDescriptor, path: &str) -> String {
    let template = descriptor
        .url_template
        .as_deref()
        .unwrap_or(DEFAULT_URL_TEMPLATE);
    let tld = descriptor.top_level_domain.as_deref().unwrap_or(DEFAULT_TLD);

    let values = [descriptor.tenant.as_str(), tld, path, ""];
    let mut out = String::new();
    let mut parts = template.split("%s");
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for (i, part) in parts.enumerate() {
        out.push_str(values.get(i).copied().unwrap_or(""));
        out.push_str(part);
    }
    out
}

fn storage_err(e: impl std::fmt::Display) -> VaultError {
    VaultError::unavailable(format!("local vault: {}", e))
}

fn parse_time(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_map(json: &str) -> Result<BTreeMap<String, Value>, VaultError> {
    serde_json::from_str(json).map_err(storage_err)
}

/// Opens per-tenant local vaults.
pub struct LocalConnector {
    root: Option<PathBuf>,
    vaults: Mutex<HashMap<String, LocalVault>>,
}

impl LocalConnector {
    /// Vaults stored as `<root>/<tenant>.db`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            vaults: Mutex::new(HashMap::new()),
        }
    }

    /// Vaults that live only as long as this connector.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            vaults: Mutex::new(HashMap::new()),
        }
    }

    /// The vault for `tenant`, opened on first use.
    pub fn vault(&self, tenant: &str) -> Result<LocalVault, VaultError> {
        if !TENANT_RE.is_match(tenant) {
            return Err(VaultError::invalid(format!("invalid tenant '{}'", tenant)));
        }

        let mut vaults = self.vaults.lock().map_err(storage_err)?;
        if let Some(vault) = vaults.get(tenant) {
            return Ok(vault.clone());
        }

        let vault = match &self.root {
            Some(root) => LocalVault::open(&root.join(format!("{}.db", tenant)))?,
            None => LocalVault::open_in_memory()?,
        };
        vaults.insert(tenant.to_string(), vault.clone());
        Ok(vault)
    }
}

impl Connector for LocalConnector {
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn VaultClient>, VaultError> {
        if descriptor.tenant.is_empty()
            || descriptor.client_id.is_empty()
            || descriptor.client_secret.expose_secret().is_empty()
        {
            return Err(VaultError::unauthorized("missing tenant or client credentials"));
        }

        debug!(
            tenant = %descriptor.tenant,
            endpoint = %endpoint(descriptor, ""),
            "opening local vault session"
        );
        Ok(Box::new(self.vault(&descriptor.tenant)?))
    }
}

/// A single tenant's local vault.
#[derive(Clone)]
pub struct LocalVault {
    conn: Arc<Mutex<Connection>>,
}

impl LocalVault {
    /// Open (or create) a vault database file.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        let _ = restrict_file_permissions(path);
        init_vault_db(&conn).map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        init_vault_db(&conn).map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, VaultError> {
        self.conn.lock().map_err(storage_err)
    }

    /// Register a role clients can be created for.
    pub fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role, VaultError> {
        if name.is_empty() {
            return Err(VaultError::invalid("role name cannot be empty"));
        }
        let conn = self.lock()?;
        let now = Utc::now();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO roles (name, description, created_at) VALUES (?1, ?2, ?3)",
                params![name, description.unwrap_or(""), now.to_rfc3339()],
            )
            .map_err(storage_err)?;
        if inserted == 0 {
            return Err(VaultError::conflict(format!("role '{}' already exists", name)));
        }

        Ok(Role {
            name: name.to_string(),
            description: description.unwrap_or("").to_string(),
            provider: None,
            external_id: None,
            created: Some(now),
        })
    }

    fn row_to_secret(row: &rusqlite::Row) -> rusqlite::Result<(Secret, String, String)> {
        Ok((
            Secret {
                id: row.get(0)?,
                path: row.get(1)?,
                description: row.get(2)?,
                data: BTreeMap::new(),
                attributes: BTreeMap::new(),
                version: row.get(5)?,
                created: parse_time(row.get(6)?),
                last_modified: parse_time(row.get(7)?),
            },
            row.get(3)?,
            row.get(4)?,
        ))
    }
}

impl VaultClient for LocalVault {
    fn get_secret(&self, path: &str) -> Result<Secret, VaultError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r#"
                SELECT id, path, description, data_json, attributes_json, version, created_at, updated_at
                FROM secrets WHERE path = ? AND deleted_at IS NULL
                "#,
                [path],
                |row| Self::row_to_secret(row),
            )
            .optional()
            .map_err(storage_err)?;

        let (mut secret, data, attributes) =
            row.ok_or_else(|| VaultError::not_found(format!("no secret at '{}'", path)))?;
        secret.data = parse_map(&data)?;
        secret.attributes = parse_map(&attributes)?;
        Ok(secret)
    }

    fn create_secret(&self, secret: &Secret) -> Result<(), VaultError> {
        validate_path(&secret.path)?;
        if secret.data.is_empty() {
            return Err(VaultError::invalid("secret data cannot be empty"));
        }

        let conn = self.lock()?;
        let existing: Option<Option<String>> = conn
            .query_row(
                "SELECT deleted_at FROM secrets WHERE path = ?",
                [&secret.path],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err)?;

        match existing {
            Some(None) => {
                return Err(VaultError::conflict(format!(
                    "a secret already exists at '{}'",
                    secret.path
                )));
            }
            Some(Some(_)) => {
                return Err(VaultError::conflict(format!(
                    "'{}' is held by a deleted secret; remove it permanently first",
                    secret.path
                )));
            }
            None => {}
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO secrets (id, path, description, data_json, attributes_json, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            "#,
            params![
                Uuid::new_v4().to_string(),
                secret.path,
                secret.description,
                serde_json::to_string(&secret.data).map_err(storage_err)?,
                serde_json::to_string(&secret.attributes).map_err(storage_err)?,
                now,
            ],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn update_secret(&self, secret: &Secret, bump_version: bool) -> Result<(), VaultError> {
        if secret.data.is_empty() {
            return Err(VaultError::invalid("secret data cannot be empty"));
        }

        let conn = self.lock()?;
        let updated = conn
            .execute(
                r#"
                UPDATE secrets SET
                    description = ?1,
                    data_json = ?2,
                    attributes_json = ?3,
                    version = version + ?4,
                    updated_at = ?5
                WHERE path = ?6 AND deleted_at IS NULL
                "#,
                params![
                    secret.description,
                    serde_json::to_string(&secret.data).map_err(storage_err)?,
                    serde_json::to_string(&secret.attributes).map_err(storage_err)?,
                    if bump_version { 1 } else { 0 },
                    Utc::now().to_rfc3339(),
                    secret.path,
                ],
            )
            .map_err(storage_err)?;

        if updated == 0 {
            return Err(VaultError::not_found(format!("no secret at '{}'", secret.path)));
        }
        Ok(())
    }

    fn delete_secret(&self, path: &str, hard_delete: bool) -> Result<(), VaultError> {
        let conn = self.lock()?;
        let result = if hard_delete {
            conn.execute("DELETE FROM secrets WHERE path = ?", [path])
        } else {
            conn.execute(
                "UPDATE secrets SET deleted_at = ?1 WHERE path = ?2 AND deleted_at IS NULL",
                params![Utc::now().to_rfc3339(), path],
            )
        };
        let affected = result.map_err(storage_err)?;

        if affected == 0 {
            return Err(VaultError::not_found(format!("no secret at '{}'", path)));
        }
        Ok(())
    }

    fn get_client(&self, client_id: &str) -> Result<ClientCredential, VaultError> {
        let conn = self.lock()?;
        conn.query_row(
            r#"
            SELECT client_id, role, description, created_at
            FROM clients WHERE client_id = ? AND deleted_at IS NULL
            "#,
            [client_id],
            |row| {
                Ok(ClientCredential {
                    client_id: row.get(0)?,
                    client_secret: None,
                    role: row.get(1)?,
                    description: row.get(2)?,
                    created: parse_time(row.get(3)?),
                })
            },
        )
        .optional()
        .map_err(storage_err)?
        .ok_or_else(|| VaultError::not_found(format!("no client '{}'", client_id)))
    }

    fn create_client(
        &self,
        role: &str,
        description: Option<&str>,
    ) -> Result<ClientCredential, VaultError> {
        let conn = self.lock()?;
        let role_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM roles WHERE name = ?)",
                [role],
                |row| row.get(0),
            )
            .map_err(storage_err)?;
        if !role_exists {
            return Err(VaultError::invalid(format!("role '{}' does not exist", role)));
        }

        let client_id = Uuid::new_v4().to_string();
        let client_secret = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO clients (client_id, client_secret, role, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                client_id,
                client_secret,
                role,
                description.unwrap_or(""),
                now.to_rfc3339()
            ],
        )
        .map_err(storage_err)?;

        Ok(ClientCredential {
            client_id,
            client_secret: Some(SecretString::from(client_secret)),
            role: role.to_string(),
            description: description.unwrap_or("").to_string(),
            created: Some(now),
        })
    }

    fn delete_client(&self, client_id: &str, hard_delete: bool) -> Result<(), VaultError> {
        let conn = self.lock()?;
        let result = if hard_delete {
            conn.execute("DELETE FROM clients WHERE client_id = ?", [client_id])
        } else {
            conn.execute(
                "UPDATE clients SET deleted_at = ?1 WHERE client_id = ?2 AND deleted_at IS NULL",
                params![Utc::now().to_rfc3339(), client_id],
            )
        };
        let affected = result.map_err(storage_err)?;

        if affected == 0 {
            return Err(VaultError::not_found(format!("no client '{}'", client_id)));
        }
        Ok(())
    }

    fn get_role(&self, name: &str) -> Result<Role, VaultError> {
        let conn = self.lock()?;
        conn.query_row(
            r#"
            SELECT name, description, provider, external_id, created_at
            FROM roles WHERE name = ?
            "#,
            [name],
            |row| {
                Ok(Role {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    provider: row.get(2)?,
                    external_id: row.get(3)?,
                    created: parse_time(row.get(4)?),
                })
            },
        )
        .optional()
        .map_err(storage_err)?
        .ok_or_else(|| VaultError::not_found(format!("no role '{}'", name)))
    }
}

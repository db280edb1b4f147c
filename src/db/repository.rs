//! Repository for state CRUD operations.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::{DbOperation, StateEntry, StoredResource};
use super::schema::{init_db, prepare};
use crate::error::{DsvError, Result};

/// Persists what the vault last reported for each managed resource.
///
/// Callers only write after an operation succeeded, so a failed create or
/// update never leaves a partial row behind.
pub struct StateStore {
    conn: Arc<Mutex<Connection>>,
}

impl StateStore {
    /// Create a new store with the given connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open the state database, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(init_db(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        prepare(&conn)?;
        Ok(Self::new(conn))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========================================================================
    // Resource operations
    // ========================================================================

    /// Insert or replace the stored representation of `address`.
    pub fn put(&self, address: &str, resource: &StoredResource) -> Result<()> {
        let observed = match resource {
            StoredResource::Secret(s) => serde_json::to_string(s)?,
            StoredResource::Client(c) => serde_json::to_string(c)?,
        };

        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO resources (address, kind, identifier, natural_key, version, observed_json, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(address) DO UPDATE SET
                kind = excluded.kind,
                identifier = excluded.identifier,
                natural_key = excluded.natural_key,
                version = excluded.version,
                observed_json = excluded.observed_json,
                updated_at = excluded.updated_at
            "#,
            params![
                address,
                resource.kind().as_str(),
                resource.identifier(),
                resource.natural_key(),
                resource.version(),
                observed,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get the stored representation of `address`.
    pub fn get(&self, address: &str) -> Result<Option<StateEntry>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT address, kind, observed_json, updated_at FROM resources WHERE address = ?",
                [address],
                Self::row_to_raw,
            )
            .optional()?;
        row.map(Self::raw_to_entry).transpose()
    }

    /// List every stored resource, ordered by address.
    pub fn list(&self) -> Result<Vec<StateEntry>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT address, kind, observed_json, updated_at FROM resources ORDER BY address",
        )?;

        let rows = stmt
            .query_map([], Self::row_to_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::raw_to_entry).collect()
    }

    /// Forget `address`. Returns whether a row was removed.
    pub fn remove(&self, address: &str) -> Result<bool> {
        let conn = self.lock();
        let removed = conn.execute("DELETE FROM resources WHERE address = ?", [address])?;
        Ok(removed > 0)
    }

    // ========================================================================
    // Operation log
    // ========================================================================

    pub fn log_operation(
        &self,
        operation_type: &str,
        address: &str,
        details: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO operations (operation_type, address, details, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![operation_type, address, details, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Most recent operations first.
    pub fn list_operations(&self, limit: Option<usize>) -> Result<Vec<DbOperation>> {
        let conn = self.lock();
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            r#"
            SELECT id, operation_type, address, details, created_at
            FROM operations
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;

        let operations = stmt
            .query_map([limit], |row| {
                Ok(DbOperation {
                    id: row.get(0)?,
                    operation_type: row.get(1)?,
                    address: row.get(2)?,
                    details: row.get(3)?,
                    created_at: parse_time(row.get(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(operations)
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn raw_to_entry(raw: (String, String, String, String)) -> Result<StateEntry> {
        let (address, kind, observed, updated_at) = raw;
        let resource = match kind.as_str() {
            "secret" => StoredResource::Secret(serde_json::from_str(&observed)?),
            "client" => StoredResource::Client(serde_json::from_str(&observed)?),
            other => {
                return Err(DsvError::document(format!(
                    "state entry '{}' has unknown kind '{}'",
                    address, other
                )));
            }
        };
        Ok(StateEntry {
            address,
            resource,
            updated_at: parse_time(updated_at),
        })
    }
}

fn parse_time(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl Clone for StateStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ClientResource, SecretResource};
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::Value;
    use uuid::Uuid;

    fn secret() -> SecretResource {
        let mut s = SecretResource::new("app/db");
        s.identifier = "id-1".to_string();
        s.version = 3;
        s.data
            .insert("password".to_string(), Value::String("pw".to_string()));
        s
    }

    #[test]
    fn test_put_get_remove() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get("secret.db").unwrap().is_none());

        store
            .put("secret.db", &StoredResource::Secret(secret()))
            .unwrap();
        let entry = store.get("secret.db").unwrap().unwrap();
        match &entry.resource {
            StoredResource::Secret(s) => assert_eq!(s, &secret()),
            other => panic!("unexpected entry: {:?}", other),
        }
        assert_eq!(entry.resource.version(), 3);

        assert!(store.remove("secret.db").unwrap());
        assert!(!store.remove("secret.db").unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_put_replaces() {
        let store = StateStore::open_in_memory().unwrap();
        let mut s = secret();
        store.put("secret.db", &StoredResource::Secret(s.clone())).unwrap();
        s.version = 4;
        store.put("secret.db", &StoredResource::Secret(s)).unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource.version(), 4);
    }

    #[test]
    fn test_client_secret_persisted() {
        let store = StateStore::open_in_memory().unwrap();
        let mut client = ClientResource::new("deployer");
        client.identifier = "c-1".to_string();
        client.client_secret = Some(SecretString::from("shh".to_string()));
        store.put("client.ci", &StoredResource::Client(client)).unwrap();

        match store.get("client.ci").unwrap().unwrap().resource {
            StoredResource::Client(c) => {
                assert_eq!(c.identifier, "c-1");
                assert_eq!(c.client_secret.unwrap().expose_secret(), "shh");
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_operation_log() {
        let store = StateStore::open_in_memory().unwrap();
        store.log_operation("create", "secret.a", None).unwrap();
        store
            .log_operation("update", "secret.a", Some("{\"version\": 2}"))
            .unwrap();

        let ops = store.list_operations(None).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].operation_type, "update");
        assert_eq!(store.list_operations(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_state_file_persists() {
        let dir = std::env::temp_dir().join(Uuid::new_v4().to_string());
        let path = dir.join("state.db");
        {
            let store = StateStore::open(&path).unwrap();
            store.put("secret.db", &StoredResource::Secret(secret())).unwrap();
        }
        let store = StateStore::open(&path).unwrap();
        assert!(store.get("secret.db").unwrap().is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

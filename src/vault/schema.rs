//! Local vault schema and initialization.

use rusqlite::{Connection, Result};

use crate::db::get_schema_version;

const SCHEMA_VERSION: i32 = 1;

/// Prepare a vault database, creating tables if needed.
pub(crate) fn init_vault_db(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    if get_schema_version(conn)? == 0 {
        create_tables(conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
            [SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Soft-deleted rows keep their path reserved until hard deleted
        CREATE TABLE secrets (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            data_json TEXT NOT NULL,
            attributes_json TEXT NOT NULL,
            version INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE roles (
            name TEXT PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            provider TEXT,
            external_id TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE clients (
            client_id TEXT PRIMARY KEY,
            client_secret TEXT NOT NULL,
            role TEXT NOT NULL REFERENCES roles(name) ON DELETE CASCADE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX idx_clients_role ON clients(role);
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_vault_db(&conn).unwrap();
        init_vault_db(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}

//! State database schema and initialization.

use rusqlite::{Connection, Result};
use std::path::Path;

const SCHEMA_VERSION: i32 = 1;

/// Initialize the state database at the given path, creating tables if needed.
pub fn init_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;

    // Observed values include secret data; owner-only access
    let _ = crate::utils::restrict_file_permissions(path);

    prepare(&conn)?;
    Ok(conn)
}

pub(super) fn prepare(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Recorded schema version, or 0 for a database without tables yet.
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per managed resource, keyed by document address
        CREATE TABLE resources (
            address TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            identifier TEXT NOT NULL,
            natural_key TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            observed_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX idx_resources_kind ON resources(kind);

        -- Operation log for tracking every applied change
        CREATE TABLE operations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            operation_type TEXT NOT NULL,
            address TEXT NOT NULL,
            details TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX idx_operations_created ON operations(created_at DESC);
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_tracks_prepare() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        prepare(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Preparing again leaves existing tables alone.
        prepare(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}

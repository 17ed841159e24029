//! SQLite schema for products, batches and allocations.
//!
//! Migrations run in order and are tracked in the `migrations` table, so
//! calling [`init_schema`] on every process start is safe.

use crate::AllocationResult;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Open (creating if needed) the database at `path` and run pending migrations.
pub fn init_schema_at(path: &Path) -> AllocationResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)
}

/// Run all pending migrations on `conn`.
pub fn init_schema(conn: &Connection) -> AllocationResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_initial_schema(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> AllocationResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: products, batches, allocations.
fn migrate_v1_initial_schema(conn: &Connection) -> AllocationResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            sku TEXT PRIMARY KEY,
            version_number INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference TEXT NOT NULL UNIQUE,
            sku TEXT NOT NULL REFERENCES products(sku),
            purchased_quantity INTEGER NOT NULL,
            eta TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_batches_sku ON batches(sku);

        CREATE TABLE IF NOT EXISTS allocations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_reference TEXT NOT NULL REFERENCES batches(reference),
            orderid TEXT NOT NULL,
            sku TEXT NOT NULL,
            qty INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_allocations_batch ON allocations(batch_reference);
        ",
    )?;
    record_migration(conn, 1, "initial_schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);

        let migrations: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(migrations, 1);
    }

    #[test]
    fn init_schema_at_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("allocation.sqlite3");

        init_schema_at(&path).unwrap();
        assert!(path.exists());
    }
}

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

/// Schema migrations, applied in order. Each script records its own version
/// in `schema_version`.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../resources/migrations/001_initial.sql"))];

/// The sweep thread and the visit path share one connection; give a second
/// process holding the file a moment before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Open the alerting database at `path`, creating and migrating it as needed.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    prepare(Connection::open(path)?)
}

/// In-memory database with the full schema (tests and tooling).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection, DatabaseError> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout={BUSY_TIMEOUT_MS};"
    ))?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Apply every migration newer than the stored schema version.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::info!(version, "Applying schema migration");
        conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
            version,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Stored schema version, 0 on a fresh file.
pub fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params!["schema_version"],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        return Ok(0);
    }
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

//! SQL schema constants and migration setup for the SQLite backends.
//!
//! Uses `rusqlite_migration` to manage schema migrations via SQLite's
//! `user_version` pragma. Migrations are embedded at compile time via
//! `include_str!`.

use std::time::Duration;

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StoreError;

/// All schema migrations, applied in order via `user_version` tracking.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("migrations/001_initial_schema.sql")),
        // Future migrations added here as new M::up(...) entries.
    ])
}

/// Opens (or creates) a SQLite database at `path` with WAL mode, foreign keys,
/// and all pending migrations applied.
pub fn open_database(path: &str) -> Result<Connection, StoreError> {
    let mut conn = Connection::open(path)?;
    configure_and_migrate(&mut conn)?;
    Ok(conn)
}

/// Opens an in-memory SQLite database with WAL mode (no-op for in-memory),
/// foreign keys, and all pending migrations applied.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let mut conn = Connection::open_in_memory()?;
    configure_and_migrate(&mut conn)?;
    Ok(conn)
}

/// Configures pragmas and applies pending migrations.
fn configure_and_migrate(conn: &mut Connection) -> Result<(), StoreError> {
    // WAL gives concurrent readers alongside the single writer.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // NORMAL synchronous is safe under WAL.
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    // Foreign key enforcement is off by default in SQLite.
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // Contending writers block for the busy timeout instead of failing
    // with SQLITE_BUSY.
    conn.busy_timeout(Duration::from_secs(5))?;

    migrations()
        .to_latest(conn)
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    Ok(())
}

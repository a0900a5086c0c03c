//! Schema migrations, versioned through `PRAGMA user_version`.

use rusqlite::Connection;
use studia_core::errors::{StorageError, StudiaResult};
use tracing::info;

pub const SCHEMA_VERSION: u32 = 1;

const MIGRATION_V1: &str = "
CREATE TABLE IF NOT EXISTS goals (
    id              INTEGER PRIMARY KEY,
    uuid            TEXT UNIQUE,
    title           TEXT NOT NULL,
    target_minutes  INTEGER NOT NULL,
    priority        TEXT NOT NULL,
    deadline        TEXT,
    status          TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    version         INTEGER,
    is_deleted      INTEGER NOT NULL DEFAULT 0,
    vector_clock    TEXT
);

CREATE TABLE IF NOT EXISTS constraints (
    id                INTEGER PRIMARY KEY,
    uuid              TEXT UNIQUE,
    title             TEXT NOT NULL,
    minutes_per_week  INTEGER NOT NULL,
    day               INTEGER,
    updated_at        TEXT NOT NULL,
    version           INTEGER,
    is_deleted        INTEGER NOT NULL DEFAULT 0,
    vector_clock      TEXT
);

CREATE TABLE IF NOT EXISTS settings (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type   TEXT NOT NULL,
    occurred_at  TEXT NOT NULL,
    payload      TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_occurred_at ON events(occurred_at);
";

/// Bring the database up to [`SCHEMA_VERSION`]. Idempotent.
pub fn run_migrations(conn: &Connection) -> StudiaResult<()> {
    let current: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|err| StorageError::MigrationFailed {
            version: 0,
            reason: err.to_string(),
        })?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    if current < 1 {
        conn.execute_batch(MIGRATION_V1)
            .map_err(|err| StorageError::MigrationFailed {
                version: 1,
                reason: err.to_string(),
            })?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|err| StorageError::MigrationFailed {
            version: SCHEMA_VERSION,
            reason: err.to_string(),
        })?;
    info!(from = current, to = SCHEMA_VERSION, "database schema migrated");
    Ok(())
}

//! Database migrations.
//!
//! Migrations are embedded in the binary and executed in order at pool init.

use rusqlite::{Connection, Result};
use tracing::info;

/// A single migration with its SQL content.
struct Migration {
    version: usize,
    name: &'static str,
    sql: &'static str,
}

/// All available migrations.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "watch_history",
    sql: "CREATE TABLE IF NOT EXISTS watch_history (
            client_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            first_watched TEXT NOT NULL,
            last_watched TEXT NOT NULL,
            view_count INTEGER NOT NULL DEFAULT 1,
            playback_position REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (client_id, file_path)
        );
        CREATE INDEX IF NOT EXISTS idx_watch_history_recent
            ON watch_history (client_id, last_watched DESC);",
}];

fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    Ok(())
}

fn current_version(conn: &Connection) -> Result<usize> {
    match conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<usize>>(0)
    }) {
        Ok(Some(version)) => Ok(version),
        Ok(None) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Run all pending migrations on the given connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;
    let applied = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?, ?)",
            rusqlite::params![migration.version, migration.name],
        )?;
        info!(version = migration.version, name = migration.name, "Applied migration");
    }

    Ok(())
}

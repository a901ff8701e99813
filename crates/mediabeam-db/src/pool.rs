//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2. Pool init creates the database
//! file if needed and runs pending migrations.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use mediabeam_core::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a new database pool backed by the given SQLite file.
///
/// Enables WAL so writers never block readers, then runs migrations on a
/// connection from the pool.
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
    });

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {e}")))?;

    Ok(pool)
}

/// Initialize an in-memory database pool for testing.
///
/// The pool is restricted to a single connection so all queries observe the
/// same in-memory database.
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {e}")))?;

    Ok(pool)
}

/// Get a connection from the pool, mapping the r2d2 error into [`Error`].
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pool_initializes() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='watch_history'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn file_pool_initializes() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = init_pool(db_path.to_str().unwrap()).unwrap();
        assert!(get_conn(&pool).is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn pool_persists_across_connections() {
        let pool = init_memory_pool().unwrap();

        {
            let conn = get_conn(&pool).unwrap();
            conn.execute(
                "INSERT INTO watch_history
                 (client_id, file_path, file_name, file_type, file_size, first_watched, last_watched)
                 VALUES ('c', '/a.mp4', 'a.mp4', 'video', 1, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }

        let conn = get_conn(&pool).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM watch_history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}

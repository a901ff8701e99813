//! Watch history queries.
//!
//! Each operation is a single SQL statement so concurrent sessions from
//! different clients never block each other beyond SQLite's own isolation.
//! Concurrent upserts from the same client for the same file may race on
//! `view_count`; eventual consistency is acceptable there.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use mediabeam_core::{Error, Result};

use crate::models::WatchRecord;

/// Record one logical playback start.
///
/// Upsert keyed on `(client_id, file_path)`: an existing record gets
/// `view_count + 1` and a fresh `last_watched`; otherwise a new record is
/// inserted with `view_count = 1`.
pub fn record_view(
    conn: &Connection,
    client_id: &str,
    file_path: &str,
    file_name: &str,
    file_type: &str,
    file_size: i64,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO watch_history
            (client_id, file_path, file_name, file_type, file_size,
             first_watched, last_watched, view_count, playback_position)
         VALUES (:client_id, :file_path, :file_name, :file_type, :file_size,
                 :now, :now, 1, 0)
         ON CONFLICT (client_id, file_path) DO UPDATE SET
            view_count = view_count + 1,
            last_watched = excluded.last_watched",
        rusqlite::named_params! {
            ":client_id": client_id,
            ":file_path": file_path,
            ":file_name": file_name,
            ":file_type": file_type,
            ":file_size": file_size,
            ":now": now,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Save the playback position for an existing record.
///
/// A position save for a `(client, file)` pair with no prior view record
/// affects zero rows and is not an error.
pub fn save_position(
    conn: &Connection,
    client_id: &str,
    file_path: &str,
    position: f64,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "UPDATE watch_history
         SET playback_position = :position,
             last_watched = :now
         WHERE client_id = :client_id AND file_path = :file_path",
        rusqlite::named_params! {
            ":client_id": client_id,
            ":file_path": file_path,
            ":position": position,
            ":now": now,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get the saved playback position, or 0 when no record exists.
pub fn get_position(conn: &Connection, client_id: &str, file_path: &str) -> Result<f64> {
    let result = conn.query_row(
        "SELECT playback_position FROM watch_history
         WHERE client_id = :client_id AND file_path = :file_path",
        rusqlite::named_params! {
            ":client_id": client_id,
            ":file_path": file_path,
        },
        |row| row.get(0),
    );

    match result {
        Ok(position) => Ok(position),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0.0),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a client's watch history, most recently watched first.
pub fn list_history(conn: &Connection, client_id: &str, limit: u32) -> Result<Vec<WatchRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT client_id, file_path, file_name, file_type, file_size,
                    first_watched, last_watched, view_count, playback_position
             FROM watch_history
             WHERE client_id = :client_id
             ORDER BY last_watched DESC
             LIMIT :limit",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let records = stmt
        .query_map(
            rusqlite::named_params! {
                ":client_id": client_id,
                ":limit": limit,
            },
            parse_record_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(records)
}

/// Most recent video record with a saved position, for resume functionality.
pub fn continue_watching(conn: &Connection, client_id: &str) -> Result<Option<WatchRecord>> {
    let result = conn.query_row(
        "SELECT client_id, file_path, file_name, file_type, file_size,
                first_watched, last_watched, view_count, playback_position
         FROM watch_history
         WHERE client_id = :client_id
           AND file_type = 'video'
           AND playback_position > 0
         ORDER BY last_watched DESC
         LIMIT 1",
        rusqlite::named_params! { ":client_id": client_id },
        parse_record_row,
    );

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

fn parse_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatchRecord> {
    Ok(WatchRecord {
        client_id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        file_type: row.get(3)?,
        file_size: row.get(4)?,
        first_watched: parse_timestamp(&row.get::<_, String>(5)?),
        last_watched: parse_timestamp(&row.get::<_, String>(6)?),
        view_count: row.get(7)?,
        playback_position: row.get(8)?,
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

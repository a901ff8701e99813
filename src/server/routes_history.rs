//! Watch-state API routes.
//!
//! Persistence failures here are soft: the handler answers
//! `{"success": false, "error": ...}` instead of an HTTP error, and nothing
//! in this module can affect an in-flight byte stream.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use mediabeam_db::{models::WatchRecord, pool, queries::watch_history};

use super::AppContext;

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub first_watched: String,
    pub last_watched: String,
    pub view_count: i64,
    pub playback_position: f64,
}

impl From<WatchRecord> for HistoryEntry {
    fn from(record: WatchRecord) -> Self {
        Self {
            file_path: record.file_path,
            file_name: record.file_name,
            file_type: record.file_type,
            file_size: record.file_size,
            first_watched: record.first_watched.to_rfc3339(),
            last_watched: record.last_watched.to_rfc3339(),
            view_count: record.view_count,
            playback_position: record.playback_position,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    #[serde(default)]
    pub position: f64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

/// Watch-state responses must never be cached.
fn no_store(body: serde_json::Value) -> Response {
    ([(header::CACHE_CONTROL.as_str(), "no-store")], Json(body)).into_response()
}

/// POST /api/save-position/{path}?position=
pub async fn save_position(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<PositionQuery>,
) -> Response {
    let client_id = addr.ip().to_string();

    let result = pool::get_conn(&ctx.db).and_then(|conn| {
        watch_history::save_position(&conn, &client_id, &request_path, query.position)
    });

    match result {
        Ok(()) => no_store(json!({"success": true})),
        Err(e) => {
            tracing::warn!(client = %client_id, path = %request_path, error = %e, "failed to save position");
            no_store(json!({"success": false, "error": e.to_string()}))
        }
    }
}

/// GET /api/get-position/{path}
pub async fn get_position(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let client_id = addr.ip().to_string();

    let result = pool::get_conn(&ctx.db)
        .and_then(|conn| watch_history::get_position(&conn, &client_id, &request_path));

    match result {
        Ok(position) => no_store(json!({"position": position})),
        Err(e) => {
            tracing::warn!(client = %client_id, path = %request_path, error = %e, "failed to read position");
            no_store(json!({"success": false, "error": e.to_string()}))
        }
    }
}

/// GET /api/continue-watching
pub async fn continue_watching(
    State(ctx): State<AppContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let client_id = addr.ip().to_string();

    let result = pool::get_conn(&ctx.db)
        .and_then(|conn| watch_history::continue_watching(&conn, &client_id));

    match result {
        Ok(record) => {
            let entry = record.map(HistoryEntry::from);
            no_store(json!({"record": entry}))
        }
        Err(e) => {
            tracing::warn!(client = %client_id, error = %e, "failed to read continue-watching");
            no_store(json!({"success": false, "error": e.to_string()}))
        }
    }
}

/// GET /api/history?limit=
pub async fn history(
    State(ctx): State<AppContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let client_id = addr.ip().to_string();

    let result = pool::get_conn(&ctx.db)
        .and_then(|conn| watch_history::list_history(&conn, &client_id, query.limit));

    match result {
        Ok(records) => {
            let entries: Vec<HistoryEntry> = records.into_iter().map(Into::into).collect();
            no_store(json!({"count": entries.len(), "history": entries}))
        }
        Err(e) => {
            tracing::warn!(client = %client_id, error = %e, "failed to read history");
            no_store(json!({"success": false, "error": e.to_string()}))
        }
    }
}

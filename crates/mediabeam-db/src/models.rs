//! Database row models.

use chrono::{DateTime, Utc};

/// One per-client, per-file viewing record.
///
/// A repeat view updates `last_watched`/`view_count` in place; the playback
/// position is mutated independently by the position-save operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRecord {
    /// Client identity (the connecting network address).
    pub client_id: String,
    /// Library-relative path of the watched file.
    pub file_path: String,
    /// File name for display.
    pub file_name: String,
    /// Inferred category ("video", "audio", ...).
    pub file_type: String,
    /// Size in bytes at the time of the first view.
    pub file_size: i64,
    /// When the file was first watched by this client.
    pub first_watched: DateTime<Utc>,
    /// When the file was last watched by this client.
    pub last_watched: DateTime<Utc>,
    /// Number of logical playback starts.
    pub view_count: i64,
    /// Last saved playback position in seconds.
    pub playback_position: f64,
}

//! Media classification tables.
//!
//! Immutable extension lookup tables built once and shared by reference.
//! The explicit MIME table exists because generic inference under-specifies
//! the audio/video container subtypes browsers need for codec negotiation;
//! [`mime_guess`] is only the fallback for everything else.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Broad category of a media file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Audio,
    Text,
    Pdf,
    Archive,
    Other,
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::Text => "text",
            MediaCategory::Pdf => "pdf",
            MediaCategory::Archive => "archive",
            MediaCategory::Other => "other",
        };
        f.write_str(s)
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mkv", "webm", "avi", "mov", "wmv", "flv", "ts", "m2ts", "mpg", "mpeg",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "flac", "wav", "ogg", "opus", "wma"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "srt", "vtt", "ass", "nfo", "log"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2"];

/// Classify a path into a [`MediaCategory`] by its extension.
pub fn category_for_path(path: &Path) -> MediaCategory {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return MediaCategory::Other,
    };

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Audio
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Text
    } else if ext == "pdf" {
        MediaCategory::Pdf
    } else if ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
        MediaCategory::Archive
    } else {
        MediaCategory::Other
    }
}

/// MIME type for a path: explicit container table first, `mime_guess` second.
pub fn mime_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let explicit = match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mkv" => Some("video/x-matroska"),
        "webm" => Some("video/webm"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        "wmv" => Some("video/x-ms-wmv"),
        "flv" => Some("video/x-flv"),
        "ts" | "m2ts" => Some("video/mp2t"),
        "mpg" | "mpeg" => Some("video/mpeg"),
        "m4a" => Some("audio/mp4"),
        "mp3" => Some("audio/mpeg"),
        "aac" => Some("audio/aac"),
        "flac" => Some("audio/flac"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "opus" => Some("audio/opus"),
        _ => None,
    };

    match explicit {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

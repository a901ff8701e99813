//! Media probing types and the [`Prober`] port.
//!
//! Probing is modeled as a trait so the HTTP layer can be tested against a
//! fake implementation that returns canned profiles without spawning a real
//! process.

mod ffprobe;

pub use ffprobe::FfprobeProber;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use mediabeam_core::Result;

/// Video codecs browsers decode natively; sources using one of these can be
/// repackaged without re-encoding the video stream.
const COPY_ELIGIBLE_CODECS: &[&str] = &["h264", "avc", "hevc", "h265"];

/// Whether the given video codec allows stream-copy instead of re-encoding.
///
/// Membership is case-insensitive; anything not on the allow-list requires a
/// full re-encode.
pub fn is_copy_eligible(codec: &str) -> bool {
    let lower = codec.to_lowercase();
    COPY_ELIGIBLE_CODECS.contains(&lower.as_str())
}

/// One audio or subtitle stream, index-assigned in container order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamTrack {
    /// 0-based index within the stream type (matches ffmpeg `-map 0:a:N`).
    pub index: u32,
    /// Codec name as reported by the probing tool.
    pub codec: String,
    /// Channel count (audio streams only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    /// ISO language tag, when the container carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Track title, when the container carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human-readable label synthesized from the metadata above.
    pub label: String,
}

/// Probed codec metadata for a media file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodecProfile {
    /// Container duration in seconds.
    pub duration_seconds: f64,
    /// Codec of the primary (first) video stream.
    pub video_codec: String,
    /// Audio streams in container order.
    pub audio_tracks: Vec<StreamTrack>,
    /// Subtitle streams in container order.
    pub subtitle_tracks: Vec<StreamTrack>,
}

/// Port for the external metadata-probing tool.
///
/// Failures (non-zero exit, timeout, unparsable output) are reported to the
/// caller once and never retried.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe duration, primary video codec, and track lists.
    async fn probe_video(&self, path: &Path) -> Result<CodecProfile>;

    /// Enumerate audio streams in container order.
    async fn audio_tracks(&self, path: &Path) -> Result<Vec<StreamTrack>>;

    /// Enumerate subtitle streams in container order.
    async fn subtitle_tracks(&self, path: &Path) -> Result<Vec<StreamTrack>>;
}

/// Describe a channel count the way players label layouts.
fn channel_layout(channels: u32) -> String {
    match channels {
        6 => "5.1".to_string(),
        8 => "7.1".to_string(),
        n => format!("{n}ch"),
    }
}

/// Synthesize a display label from track metadata.
///
/// Preference order: title, then language, then `Track N` (1-indexed).
/// Audio tracks get a channel-layout suffix when the count is known.
pub(crate) fn synthesize_label(
    index: u32,
    title: Option<&str>,
    language: Option<&str>,
    channels: Option<u32>,
) -> String {
    let base = title
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            language
                .filter(|l| !l.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Track {}", index + 1));

    match channels {
        Some(n) => format!("{base} ({})", channel_layout(n)),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_eligibility_is_case_insensitive() {
        assert!(is_copy_eligible("h264"));
        assert!(is_copy_eligible("H264"));
        assert!(is_copy_eligible("HEVC"));
        assert!(is_copy_eligible("hevc"));
        assert!(is_copy_eligible("h265"));
        assert!(is_copy_eligible("avc"));
    }

    #[test]
    fn non_browser_codecs_need_transcode() {
        assert!(!is_copy_eligible("mpeg4"));
        assert!(!is_copy_eligible("vp9"));
        assert!(!is_copy_eligible("av1"));
        assert!(!is_copy_eligible("wmv3"));
        assert!(!is_copy_eligible(""));
    }

    #[test]
    fn dotted_variant_is_not_on_the_allow_list() {
        // Only the bare names are eligible; callers normalize upstream.
        assert!(!is_copy_eligible("H.264"));
    }

    #[test]
    fn channel_layouts() {
        assert_eq!(channel_layout(6), "5.1");
        assert_eq!(channel_layout(8), "7.1");
        assert_eq!(channel_layout(2), "2ch");
        assert_eq!(channel_layout(1), "1ch");
    }

    #[test]
    fn label_prefers_title() {
        let label = synthesize_label(0, Some("Director Commentary"), Some("eng"), Some(2));
        assert_eq!(label, "Director Commentary (2ch)");
    }

    #[test]
    fn label_falls_back_to_language() {
        let label = synthesize_label(1, None, Some("jpn"), Some(6));
        assert_eq!(label, "jpn (5.1)");
    }

    #[test]
    fn label_falls_back_to_track_number() {
        assert_eq!(synthesize_label(0, None, None, None), "Track 1");
        assert_eq!(synthesize_label(2, None, None, None), "Track 3");
    }

    #[test]
    fn empty_metadata_counts_as_absent() {
        assert_eq!(synthesize_label(0, Some(""), Some(""), None), "Track 1");
    }
}

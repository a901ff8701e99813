//! FFprobe-based [`Prober`] implementation.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and maps the JSON output into [`CodecProfile`] and
//! [`StreamTrack`] lists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use mediabeam_core::{Error, Result};

use super::{synthesize_label, CodecProfile, Prober, StreamTrack};
use crate::command::run_tool;

/// Probe calls are bounded; a hung ffprobe must not stall a request forever.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    async fn run_ffprobe(&self, path: &Path, select_streams: Option<&str>) -> Result<FfprobeOutput> {
        let mut args = vec![
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ];
        if let Some(selector) = select_streams {
            args.push("-select_streams");
            args.push(selector);
        }
        let path_arg = path.to_string_lossy();
        args.push(path_arg.as_ref());

        let stdout = run_tool(&self.ffprobe_path, args, PROBE_TIMEOUT)
            .await
            .map_err(|e| Error::Probe(e.to_string()))?;

        serde_json::from_str(&stdout)
            .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe_video(&self, path: &Path) -> Result<CodecProfile> {
        let output = self.run_ffprobe(path, None).await?;
        parse_profile(output)
    }

    async fn audio_tracks(&self, path: &Path) -> Result<Vec<StreamTrack>> {
        let output = self.run_ffprobe(path, Some("a")).await?;
        Ok(parse_tracks(&output.streams, "audio"))
    }

    async fn subtitle_tracks(&self, path: &Path) -> Result<Vec<StreamTrack>> {
        let output = self.run_ffprobe(path, Some("s")).await?;
        Ok(parse_tracks(&output.streams, "subtitle"))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_profile(output: FfprobeOutput) -> Result<CodecProfile> {
    let duration_seconds = output
        .format
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let video_codec = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| s.codec_name.clone())
        .ok_or_else(|| Error::Probe("no video stream found".into()))?;

    Ok(CodecProfile {
        duration_seconds,
        video_codec,
        audio_tracks: parse_tracks(&output.streams, "audio"),
        subtitle_tracks: parse_tracks(&output.streams, "subtitle"),
    })
}

/// Build index-assigned tracks for one stream type, in container order.
fn parse_tracks(streams: &[FfprobeStream], codec_type: &str) -> Vec<StreamTrack> {
    streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some(codec_type))
        .enumerate()
        .map(|(index, stream)| {
            let index = index as u32;
            let channels = if codec_type == "audio" {
                stream.channels
            } else {
                None
            };
            let label = synthesize_label(
                index,
                stream.tags.title.as_deref(),
                stream.tags.language.as_deref(),
                channels,
            );
            StreamTrack {
                index,
                codec: stream.codec_name.clone().unwrap_or_default(),
                channels,
                language: stream.tags.language.clone(),
                title: stream.tags.title.clone(),
                label,
            }
        })
        .collect()
}

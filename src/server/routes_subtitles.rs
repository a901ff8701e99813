//! Subtitle extraction route.
//!
//! Extracts a subtitle track from the source file via ffmpeg, serving it as
//! WebVTT with cue timestamps shifted by the requested offset.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use mediabeam_av::run_tool;

use super::{error::AppError, routes_media::checked_path, AppContext};

/// Subtitle extraction is a one-shot conversion; a whole-file pass over a
/// large container still finishes well inside this bound.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct SubtitleQuery {
    /// 0-based subtitle stream index.
    #[serde(default)]
    pub track: u32,
    /// Seconds to shift every cue by (player sync correction).
    #[serde(default)]
    pub offset: f64,
}

/// GET /api/subtitles/{path}?track=&offset=
pub async fn get_subtitles(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
    Query(query): Query<SubtitleQuery>,
) -> Result<impl IntoResponse, AppError> {
    let file_path = checked_path(&ctx, &request_path).await?;

    let ffmpeg = ctx.tools.require("ffmpeg")?;
    let source = file_path.to_string_lossy();
    let track_map = format!("0:s:{}", query.track);
    let args = [
        "-v",
        "quiet",
        "-i",
        source.as_ref(),
        "-map",
        track_map.as_str(),
        "-f",
        "webvtt",
        "-",
    ];
    let stdout = run_tool(ffmpeg, args, EXTRACT_TIMEOUT).await?;

    let vtt = shift_vtt_timestamps(&stdout, query.offset);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE.as_str(), "text/vtt; charset=utf-8"),
            (header::CACHE_CONTROL.as_str(), "no-store"),
        ],
        vtt,
    ))
}

/// Shift all cue timestamps in a WebVTT document by `offset` seconds.
///
/// Cue lines are `start --> end` optionally followed by settings; every
/// other line passes through untouched. Shifts below zero clamp to zero.
fn shift_vtt_timestamps(vtt: &str, offset: f64) -> String {
    if offset == 0.0 {
        return vtt.to_string();
    }

    vtt.lines()
        .map(|line| {
            if line.contains("-->") {
                shift_cue_line(line, offset).unwrap_or_else(|| line.to_string())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn shift_cue_line(line: &str, offset: f64) -> Option<String> {
    let (start_part, rest) = line.split_once("-->")?;
    let start = parse_vtt_timestamp(start_part.trim())?;

    let mut rest_parts = rest.trim().splitn(2, char::is_whitespace);
    let end = parse_vtt_timestamp(rest_parts.next()?.trim())?;
    let settings = rest_parts.next();

    let start = format_vtt_timestamp((start + offset).max(0.0));
    let end = format_vtt_timestamp((end + offset).max(0.0));

    Some(match settings {
        Some(settings) => format!("{start} --> {end} {settings}"),
        None => format!("{start} --> {end}"),
    })
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
fn parse_vtt_timestamp(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn format_vtt_timestamp(total: f64) -> String {
    let millis = (total * 1000.0).round() as u64;
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1000) % 60;
    let millis = millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

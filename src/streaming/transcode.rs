//! Transcoded streaming sessions.
//!
//! One external encoder process per request: probe the source, pick the
//! pipeline, spawn, and forward stdout chunks as a fragmented MP4 body of
//! indeterminate length. The encoder supervisor inside `mediabeam-av` owns
//! the process, so dropping the response body (client disconnect) takes the
//! process down with it.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use mediabeam_av::{EncodePlan, TranscodeRequest};
use mediabeam_core::Error;

use crate::server::{error::AppError, AppContext};
use crate::streaming::{report_view, resolve_media_path};

#[derive(Debug, Deserialize)]
pub struct TranscodeQuery {
    /// Playback start offset in seconds.
    #[serde(default)]
    pub start_time: f64,
    /// 0-based audio stream index.
    #[serde(default)]
    pub audio_track: u32,
}

/// GET /transcode/{path}?start_time=&audio_track=
///
/// Stream a re-encoded (or stream-copied) rendition of the source as
/// fragmented MP4. A later `start_time` is a user seek and starts an
/// entirely new session; there is no session resumption.
pub async fn transcode_stream(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<TranscodeQuery>,
) -> Result<Response, AppError> {
    let file_path = resolve_media_path(&ctx.config.library.root, &request_path)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| Error::not_found("file", &request_path))?;
    if !metadata.is_file() {
        return Err(Error::not_found("file", &request_path).into());
    }

    // Probing failure is terminal; no process is spawned.
    let profile = ctx.prober.probe_video(&file_path).await?;

    // Same first-segment heuristic as direct streaming: only a session
    // starting at zero counts as a new view.
    if query.start_time <= 0.0 {
        report_view(
            &ctx,
            &addr.ip().to_string(),
            &request_path,
            &file_path,
            metadata.len(),
        );
    }

    let request = TranscodeRequest {
        source: file_path,
        start_seconds: query.start_time.max(0.0),
        audio_track: query.audio_track,
    };
    let plan = EncodePlan::build(&profile, &request);

    tracing::info!(
        path = %request_path,
        codec = %profile.video_codec,
        pipeline = ?plan.pipeline,
        start = request.start_seconds,
        audio_track = request.audio_track,
        "starting transcode session"
    );

    let session = ctx.encoder.launch(&plan)?;

    // No Content-Length: the fragmented output has indeterminate total size.
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE.as_str(), "video/mp4".to_string()),
            (header::CACHE_CONTROL.as_str(), "no-cache".to_string()),
            ("x-content-duration", profile.duration_seconds.to_string()),
            ("x-start-time", request.start_seconds.to_string()),
        ],
        Body::from_stream(session.stream),
    )
        .into_response())
}

//! Media metadata API routes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use mediabeam_av::is_copy_eligible;
use mediabeam_core::Error;

use super::{error::AppError, AppContext};
use crate::streaming::resolve_media_path;

/// GET /api/video-info/{path}
pub async fn video_info(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
) -> Result<Json<Value>, AppError> {
    let file_path = checked_path(&ctx, &request_path).await?;
    let profile = ctx.prober.probe_video(&file_path).await?;

    Ok(Json(json!({
        "duration": profile.duration_seconds,
        "codec": profile.video_codec,
        "needs_transcode": !is_copy_eligible(&profile.video_codec),
    })))
}

/// GET /api/audio-tracks/{path}
pub async fn audio_tracks(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
) -> Result<Json<Value>, AppError> {
    let file_path = checked_path(&ctx, &request_path).await?;
    let tracks = ctx.prober.audio_tracks(&file_path).await?;

    Ok(Json(json!({
        "count": tracks.len(),
        "tracks": tracks,
    })))
}

/// GET /api/subtitle-tracks/{path}
pub async fn subtitle_tracks(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
) -> Result<Json<Value>, AppError> {
    let file_path = checked_path(&ctx, &request_path).await?;
    let tracks = ctx.prober.subtitle_tracks(&file_path).await?;

    Ok(Json(json!({
        "count": tracks.len(),
        "tracks": tracks,
    })))
}

/// Resolve the request path and confirm a regular file exists there.
pub(super) async fn checked_path(
    ctx: &AppContext,
    request_path: &str,
) -> Result<std::path::PathBuf, AppError> {
    let file_path = resolve_media_path(&ctx.config.library.root, request_path)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| Error::not_found("file", request_path))?;
    if !metadata.is_file() {
        return Err(Error::not_found("file", request_path).into());
    }

    Ok(file_path)
}

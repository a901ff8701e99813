//! Direct streaming with HTTP range requests.
//!
//! Serves media files straight from storage, either whole (200) or as an
//! exact byte window (206). A view event is recorded when playback starts
//! from the beginning; mid-stream re-requests are not new views.

use std::io::SeekFrom;
use std::net::SocketAddr;
use std::time::SystemTime;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use mediabeam_core::{media, Error};

use crate::server::{error::AppError, AppContext};
use crate::streaming::range::resolve_range;
use crate::streaming::{report_view, resolve_media_path};

/// GET /stream/{path}
///
/// Serve a media file with range request support.
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let file_path = resolve_media_path(&ctx.config.library.root, &request_path)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| Error::not_found("file", &request_path))?;
    if !metadata.is_file() {
        return Err(Error::not_found("file", &request_path).into());
    }

    let file_size = metadata.len();
    let content_type = media::mime_for_path(&file_path);

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let range = match resolve_range(range_header, file_size) {
        Ok(range) => range,
        Err(Error::UnsatisfiableRange(reason)) => {
            tracing::debug!(path = %request_path, %reason, "unsatisfiable range");
            return Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
                .body(Body::empty())
                .map_err(|e| Error::Internal(e.to_string()).into());
        }
        Err(e) => return Err(e.into()),
    };

    // First playback is distinguished from a mid-stream re-request by the
    // absence of a range or a range starting at byte 0.
    if range.map_or(true, |r| r.start == 0) {
        report_view(&ctx, &addr.ip().to_string(), &request_path, &file_path, file_size);
    }

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(modified) = metadata.modified().ok().map(http_date) {
        builder = builder.header(header::LAST_MODIFIED, modified);
    }

    let response = match range {
        Some(range) => {
            let mut file = File::open(&file_path)
                .await
                .map_err(|_| Error::not_found("file", &request_path))?;

            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(Error::from)?;

            // Take limits reads to exactly the resolved window.
            let stream = ReaderStream::with_capacity(file.take(range.length()), 64 * 1024);

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, range.content_range())
                .header(header::CONTENT_LENGTH, range.length().to_string())
                .body(Body::from_stream(stream))
        }
        None => {
            let file = File::open(&file_path)
                .await
                .map_err(|_| Error::not_found("file", &request_path))?;

            let stream = ReaderStream::with_capacity(file, 64 * 1024);

            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, file_size.to_string())
                .body(Body::from_stream(stream))
        }
    };

    response.map_err(|e| Error::Internal(e.to_string()).into())
}

/// GET /download/{path}
///
/// Serve the whole file as an attachment download.
pub async fn download_file(
    State(ctx): State<AppContext>,
    Path(request_path): Path<String>,
) -> Result<Response, AppError> {
    let file_path = resolve_media_path(&ctx.config.library.root, &request_path)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| Error::not_found("file", &request_path))?;
    if !metadata.is_file() {
        return Err(Error::not_found("file", &request_path).into());
    }

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let file = File::open(&file_path)
        .await
        .map_err(|_| Error::not_found("file", &request_path))?;

    let stream = ReaderStream::with_capacity(file, 64 * 1024);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media::mime_for_path(&file_path))
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .header(header::CONTENT_LENGTH, metadata.len().to_string())
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Internal(e.to_string()).into())
}

/// Format a filesystem timestamp as an HTTP date.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

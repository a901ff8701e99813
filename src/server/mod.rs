//! HTTP server assembly: shared context, router, and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use mediabeam_av::{EncoderLauncher, Prober, ToolRegistry};
use mediabeam_core::config::Config;
use mediabeam_db::pool::DbPool;

use crate::streaming;

pub mod error;
pub mod routes_history;
pub mod routes_media;
pub mod routes_subtitles;

/// Application context shared by all request handlers (via Axum state).
///
/// Cheaply cloneable; the prober and encoder are trait objects so tests can
/// substitute fakes that never spawn a process.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool (watch history).
    pub db: DbPool,
    /// Immutable application configuration.
    pub config: Arc<Config>,
    /// Media file prober.
    pub prober: Arc<dyn Prober>,
    /// Streaming encoder launcher.
    pub encoder: Arc<dyn EncoderLauncher>,
    /// External tool registry (one-shot invocations, e.g. subtitle extraction).
    pub tools: Arc<ToolRegistry>,
}

/// Create the Axum router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Byte streaming
        .route("/stream/*path", get(streaming::direct::stream_file))
        .route("/download/*path", get(streaming::direct::download_file))
        .route("/transcode/*path", get(streaming::transcode::transcode_stream))
        // JSON API
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/video-info/*path", get(routes_media::video_info))
        .route("/audio-tracks/*path", get(routes_media::audio_tracks))
        .route("/subtitle-tracks/*path", get(routes_media::subtitle_tracks))
        .route("/subtitles/*path", get(routes_subtitles::get_subtitles))
        .route("/save-position/*path", post(routes_history::save_position))
        .route("/get-position/*path", get(routes_history::get_position))
        .route("/continue-watching", get(routes_history::continue_watching))
        .route("/history", get(routes_history::history))
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server and block until shutdown.
pub async fn start_server(config: Config, ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // ConnectInfo carries the peer address used as the watch-history client
    // identity.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temp media
//! root, and a full [`AppContext`] wired to fake prober/encoder
//! implementations. The [`with_server`] constructor starts Axum on a random
//! port for HTTP-level testing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio_stream::wrappers::ReceiverStream;

use mediabeam::server::{create_router, AppContext};
use mediabeam_av::{
    stream_command, CodecProfile, EncodePlan, EncoderLauncher, EncoderStream, Prober, StreamTrack,
    ToolRegistry,
};
use mediabeam_core::config::Config;
use mediabeam_core::{Error, Result};
use mediabeam_db::pool::{get_conn, init_memory_pool, DbPool, PooledConnection};

/// Prober returning a canned profile, or a probe failure when `profile` is
/// `None`.
pub struct FakeProber {
    pub profile: Option<CodecProfile>,
}

impl FakeProber {
    pub fn with_codec(codec: &str) -> Self {
        Self {
            profile: Some(CodecProfile {
                duration_seconds: 5400.0,
                video_codec: codec.to_string(),
                audio_tracks: vec![StreamTrack {
                    index: 0,
                    codec: "aac".to_string(),
                    channels: Some(6),
                    language: Some("eng".to_string()),
                    title: None,
                    label: "eng (5.1)".to_string(),
                }],
                subtitle_tracks: vec![],
            }),
        }
    }

    pub fn failing() -> Self {
        Self { profile: None }
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe_video(&self, _path: &Path) -> Result<CodecProfile> {
        self.profile
            .clone()
            .ok_or_else(|| Error::Probe("canned probe failure".into()))
    }

    async fn audio_tracks(&self, path: &Path) -> Result<Vec<StreamTrack>> {
        Ok(self.probe_video(path).await?.audio_tracks)
    }

    async fn subtitle_tracks(&self, path: &Path) -> Result<Vec<StreamTrack>> {
        Ok(self.probe_video(path).await?.subtitle_tracks)
    }
}

/// Launcher that records every plan and returns canned output chunks
/// without spawning a process.
pub struct FakeLauncher {
    pub plans: Mutex<Vec<EncodePlan>>,
    pub chunks: Vec<Bytes>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            plans: Mutex::new(Vec::new()),
            chunks: vec![
                Bytes::from_static(b"ftypfragment-one"),
                Bytes::from_static(b"moof-fragment-two"),
            ],
        }
    }

    pub fn launched_plans(&self) -> Vec<EncodePlan> {
        self.plans.lock().clone()
    }
}

impl EncoderLauncher for FakeLauncher {
    fn launch(&self, plan: &EncodePlan) -> Result<EncoderStream> {
        self.plans.lock().push(plan.clone());

        let (tx, rx) = tokio::sync::mpsc::channel::<std::io::Result<Bytes>>(8);
        for chunk in &self.chunks {
            // Channel capacity exceeds the canned chunk count.
            tx.try_send(Ok(chunk.clone())).expect("channel full");
        }
        drop(tx);

        Ok(EncoderStream {
            pid: None,
            stream: ReceiverStream::new(rx),
        })
    }
}

/// Launcher that spawns a real never-ending process, for cancellation tests.
#[cfg(unix)]
pub struct HangingLauncher {
    pub pid: Mutex<Option<u32>>,
}

#[cfg(unix)]
impl HangingLauncher {
    pub fn new() -> Self {
        Self {
            pid: Mutex::new(None),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        *self.pid.lock()
    }
}

#[cfg(unix)]
impl EncoderLauncher for HangingLauncher {
    fn launch(&self, _plan: &EncodePlan) -> Result<EncoderStream> {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg("while true; do printf xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx; done");
        let session = stream_command(cmd, "ffmpeg")?;
        *self.pid.lock() = session.pid;
        Ok(session)
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temp media root.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub media_root: tempfile::TempDir,
}

impl TestHarness {
    /// Create a harness with an h264 (copy-eligible) fake prober.
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(FakeProber::with_codec("h264")),
            Arc::new(FakeLauncher::new()),
        )
    }

    /// Create a harness with custom prober/encoder fakes.
    pub fn with_parts(prober: Arc<dyn Prober>, encoder: Arc<dyn EncoderLauncher>) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let media_root = tempfile::tempdir().expect("failed to create media root");

        let mut config = Config::default();
        config.library.root = media_root.path().to_path_buf();

        let ctx = AppContext {
            db: db.clone(),
            config: Arc::new(config.clone()),
            prober,
            encoder,
            tools: Arc::new(ToolRegistry::discover(&config.tools)),
        };

        Self {
            ctx,
            db,
            media_root,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    /// Start an Axum server using custom prober/encoder fakes.
    pub async fn with_server_parts(
        prober: Arc<dyn Prober>,
        encoder: Arc<dyn EncoderLauncher>,
    ) -> (Self, SocketAddr) {
        Self::serve(Self::with_parts(prober, encoder)).await
    }

    async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        (harness, addr)
    }

    /// Write a file into the media root and return its relative name.
    pub fn write_media(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.media_root.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.db).expect("failed to get db connection")
    }
}

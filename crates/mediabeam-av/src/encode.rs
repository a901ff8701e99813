//! Encoder invocation planning and streaming session management.
//!
//! [`EncodePlan`] decides copy-vs-transcode from the probed codec and builds
//! the full ffmpeg argument list, including the seek strategy. The
//! [`EncoderLauncher`] port spawns one encoder process per playback session
//! and hands back an [`EncoderStream`]; a supervisor task owns the child for
//! its whole life, so the process is terminated and reaped on every exit
//! path, including client disconnect mid-stream.

use std::path::PathBuf;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use mediabeam_core::{Error, Result};

use crate::probe::{is_copy_eligible, CodecProfile};

/// Chunk size for reads from the encoder's stdout pipe.
const CHUNK_SIZE: usize = 64 * 1024;

/// How far before the requested position the container-level seek lands.
/// The remainder is covered by a frame-accurate seek after input open.
const COARSE_SEEK_MARGIN: f64 = 30.0;

/// Grace period between the termination signal and the hard kill.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// One playback session's desired starting point and audio selection.
///
/// Not unique: a request with a later `start_seconds` is a user seek and
/// starts an entirely new session.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// Playback start offset in seconds.
    pub start_seconds: f64,
    /// 0-based audio stream index, passed to the encoder unvalidated.
    pub audio_track: u32,
}

/// Whether the video stream is copied or fully re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Video stream copied verbatim; audio still re-encoded to a uniform
    /// browser-safe format.
    Copy,
    /// Full video re-encode at a latency-oriented preset.
    Transcode,
}

/// A fully planned encoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    /// Source file passed as the encoder input.
    pub input: PathBuf,
    /// Copy or full re-encode.
    pub pipeline: Pipeline,
    /// Container-level seek applied before opening the input.
    pub coarse_seek: f64,
    /// Frame-accurate seek applied after opening the input.
    pub fine_seek: f64,
    /// Selected audio stream (0-based).
    pub audio_track: u32,
}

impl EncodePlan {
    /// Plan an encoder invocation from the probed profile and the request.
    ///
    /// Copy pipeline splits the seek: a fast container-level jump to
    /// `start - 30s`, then a frame-accurate seek across the remainder. The
    /// transcode pipeline decodes everything anyway, so a single pre-input
    /// seek is both fast and accurate.
    pub fn build(profile: &CodecProfile, request: &TranscodeRequest) -> Self {
        let pipeline = if is_copy_eligible(&profile.video_codec) {
            Pipeline::Copy
        } else {
            Pipeline::Transcode
        };

        let start = request.start_seconds.max(0.0);
        let (coarse_seek, fine_seek) = if start == 0.0 {
            (0.0, 0.0)
        } else {
            match pipeline {
                Pipeline::Copy => {
                    let coarse = (start - COARSE_SEEK_MARGIN).max(0.0);
                    (coarse, start - coarse)
                }
                Pipeline::Transcode => (start, 0.0),
            }
        };

        Self {
            input: request.source.clone(),
            pipeline,
            coarse_seek,
            fine_seek,
            audio_track: request.audio_track,
        }
    }

    /// Build the full ffmpeg argument list for this plan.
    ///
    /// Output is a fragmented MP4 on stdout, playable as it is produced.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];

        if self.coarse_seek > 0.0 {
            args.push("-ss".into());
            args.push(self.coarse_seek.to_string());
        }

        args.push("-i".into());
        args.push(self.input.to_string_lossy().into_owned());

        if self.fine_seek > 0.0 {
            args.push("-ss".into());
            args.push(self.fine_seek.to_string());
        }

        args.push("-map".into());
        args.push("0:v:0".into());
        args.push("-map".into());
        args.push(format!("0:a:{}", self.audio_track));

        match self.pipeline {
            Pipeline::Copy => {
                args.push("-c:v".into());
                args.push("copy".into());
            }
            Pipeline::Transcode => {
                args.extend(
                    ["-c:v", "libx264", "-preset", "veryfast", "-crf", "23"]
                        .iter()
                        .map(|s| s.to_string()),
                );
            }
        }

        args.extend(
            [
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-ac",
                "2",
                "-movflags",
                "frag_keyframe+empty_moov+default_base_moof",
                "-f",
                "mp4",
                "pipe:1",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        args
    }
}

/// A live encoder session: the process id plus its ordered output chunks.
///
/// Dropping the stream is the cancellation signal; the supervisor task
/// notices and takes the process down before exiting.
pub struct EncoderStream {
    /// OS process id, when the process is still considered running at spawn.
    pub pid: Option<u32>,
    /// Ordered output chunks from the encoder's stdout.
    pub stream: ReceiverStream<std::io::Result<Bytes>>,
}

/// Port for spawning streaming encoder processes.
///
/// Modeled as a trait so route handlers can be exercised against a fake that
/// returns canned byte streams without ever spawning a process.
pub trait EncoderLauncher: Send + Sync {
    /// Spawn one encoder process for the plan and return its output stream.
    fn launch(&self, plan: &EncodePlan) -> Result<EncoderStream>;
}

/// [`EncoderLauncher`] backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    ffmpeg_path: PathBuf,
}

impl FfmpegLauncher {
    /// Create a launcher using the given ffmpeg path.
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }
}

impl EncoderLauncher for FfmpegLauncher {
    fn launch(&self, plan: &EncodePlan) -> Result<EncoderStream> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(plan.to_args());
        stream_command(cmd, "ffmpeg")
    }
}

/// Spawn `cmd` with piped stdout/stderr and supervise it until it exits.
///
/// The returned [`EncoderStream`] yields stdout in strict production order.
/// The supervisor task owns the [`Child`]; it reaps on EOF, logs a non-zero
/// exit with the stderr tail, and kills (signal, grace wait, hard kill) as
/// soon as the receiving side goes away.
pub fn stream_command(mut cmd: Command, tool: &'static str) -> Result<EncoderStream> {
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    // Last line of defense; the supervisor task normally reaps explicitly.
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| Error::Tool {
        tool: tool.to_string(),
        message: format!("failed to spawn: {e}"),
    })?;

    let pid = child.id();

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("encoder stdout was not captured".into()))?;

    // Drain stderr on its own task so a chatty encoder can never deadlock
    // the stdout pipe; the collected text is only read at exit time.
    let stderr = child.stderr.take();
    let (err_tx, err_rx) = oneshot::channel::<String>();
    tokio::spawn(async move {
        let mut collected = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut collected).await;
        }
        let _ = err_tx.send(collected);
    });

    let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(8);

    tokio::spawn(async move {
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        loop {
            buf.reserve(CHUNK_SIZE);
            tokio::select! {
                read = stdout.read_buf(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(Ok(buf.split().freeze())).await.is_err() {
                            // Client went away; not a failure.
                            debug!(tool, pid, "output consumer dropped; stopping encoder");
                            kill_and_reap(&mut child, tool).await;
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(tool, pid, error = %e, "read from encoder pipe failed");
                        let _ = tx.send(Err(e)).await;
                        kill_and_reap(&mut child, tool).await;
                        return;
                    }
                },
                _ = tx.closed() => {
                    debug!(tool, pid, "output consumer dropped; stopping encoder");
                    kill_and_reap(&mut child, tool).await;
                    return;
                }
            }
        }

        // Pipe closed: reap and report the exit status.
        match child.wait().await {
            Ok(status) if status.success() => {
                debug!(tool, pid, "encoder completed");
            }
            Ok(status) => {
                let stderr = err_rx.await.unwrap_or_default();
                warn!(tool, pid, %status, stderr = %stderr.trim(), "encoder exited with failure");
            }
            Err(e) => {
                warn!(tool, pid, error = %e, "failed to reap encoder");
            }
        }
    });

    Ok(EncoderStream {
        pid,
        stream: ReceiverStream::new(rx),
    })
}

/// Terminate and reap the child: termination signal first, bounded grace
/// wait, then a hard kill. Never returns before the process is reaped.
async fn kill_and_reap(child: &mut Child, tool: &'static str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain signal send to a pid we own.
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        match tokio::time::timeout(KILL_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(tool, pid, %status, "encoder stopped after termination signal");
                return;
            }
            Ok(Err(e)) => {
                warn!(tool, pid, error = %e, "wait after termination signal failed");
            }
            Err(_) => {
                warn!(tool, pid, "encoder ignored termination signal; killing");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(tool, error = %e, "failed to kill encoder");
    }
    let _ = child.wait().await;
}

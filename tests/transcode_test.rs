//! Integration tests for the transcode route: pipeline selection, seek
//! strategy, view recording, and process teardown on client disconnect.

mod common;

use std::sync::Arc;

use common::{FakeLauncher, FakeProber, TestHarness};
use mediabeam_av::Pipeline;
use mediabeam_db::queries::watch_history;

#[tokio::test]
async fn copy_eligible_source_uses_copy_pipeline_with_split_seek() {
    let launcher = Arc::new(FakeLauncher::new());
    let (h, addr) = TestHarness::with_server_parts(
        Arc::new(FakeProber::with_codec("h264")),
        launcher.clone(),
    )
    .await;
    h.write_media("movie.mp4", &vec![0u8; 64]);

    let resp = reqwest::get(format!(
        "http://{addr}/transcode/movie.mp4?start_time=45"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "video/mp4"
    );
    assert_eq!(
        resp.headers().get("cache-control").unwrap().to_str().unwrap(),
        "no-cache"
    );
    assert_eq!(
        resp.headers()
            .get("x-content-duration")
            .unwrap()
            .to_str()
            .unwrap(),
        "5400"
    );
    assert_eq!(
        resp.headers().get("x-start-time").unwrap().to_str().unwrap(),
        "45"
    );
    assert!(resp.headers().get("content-length").is_none());

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"ftypfragment-onemoof-fragment-two".as_slice());

    let plans = launcher.launched_plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].pipeline, Pipeline::Copy);
    assert_eq!(plans[0].coarse_seek, 15.0);
    assert_eq!(plans[0].fine_seek, 30.0);
}

#[tokio::test]
async fn non_eligible_source_uses_single_seek_transcode() {
    let launcher = Arc::new(FakeLauncher::new());
    let (h, addr) = TestHarness::with_server_parts(
        Arc::new(FakeProber::with_codec("mpeg4")),
        launcher.clone(),
    )
    .await;
    h.write_media("movie.avi", &vec![0u8; 64]);

    let resp = reqwest::get(format!(
        "http://{addr}/transcode/movie.avi?start_time=45"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    resp.bytes().await.unwrap();

    let plans = launcher.launched_plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].pipeline, Pipeline::Transcode);
    assert_eq!(plans[0].coarse_seek, 45.0);
    assert_eq!(plans[0].fine_seek, 0.0);
}

#[tokio::test]
async fn session_from_zero_records_one_view() {
    let (h, addr) = TestHarness::with_server().await;
    h.write_media("movie.mp4", &vec![0u8; 64]);

    let resp = reqwest::get(format!("http://{addr}/transcode/movie.mp4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.bytes().await.unwrap();

    let conn = h.conn();
    let records = watch_history::list_history(&conn, "127.0.0.1", 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].view_count, 1);
}

#[tokio::test]
async fn seek_session_is_not_a_new_view() {
    let (h, addr) = TestHarness::with_server().await;
    h.write_media("movie.mp4", &vec![0u8; 64]);

    let resp = reqwest::get(format!(
        "http://{addr}/transcode/movie.mp4?start_time=120"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    resp.bytes().await.unwrap();

    let conn = h.conn();
    let records = watch_history::list_history(&conn, "127.0.0.1", 10).unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn audio_track_is_passed_through_unvalidated() {
    let launcher = Arc::new(FakeLauncher::new());
    let (h, addr) = TestHarness::with_server_parts(
        Arc::new(FakeProber::with_codec("h264")),
        launcher.clone(),
    )
    .await;
    h.write_media("movie.mp4", &vec![0u8; 64]);

    // The fake profile has one audio track; index 7 goes through anyway and
    // would surface as an encoder failure, not a local validation error.
    let resp = reqwest::get(format!(
        "http://{addr}/transcode/movie.mp4?audio_track=7"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    resp.bytes().await.unwrap();

    assert_eq!(launcher.launched_plans()[0].audio_track, 7);
}

#[tokio::test]
async fn probe_failure_is_500_and_spawns_nothing() {
    let launcher = Arc::new(FakeLauncher::new());
    let (h, addr) =
        TestHarness::with_server_parts(Arc::new(FakeProber::failing()), launcher.clone()).await;
    h.write_media("movie.mp4", &vec![0u8; 64]);

    let resp = reqwest::get(format!("http://{addr}/transcode/movie.mp4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(launcher.launched_plans().is_empty());
}

#[tokio::test]
async fn missing_file_is_404_without_probing() {
    let (_h, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/transcode/ghost.mp4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[cfg(unix)]
mod disconnect {
    use super::*;
    use crate::common::HangingLauncher;
    use std::time::{Duration, Instant};

    fn pid_running(pid: u32) -> bool {
        // SAFETY: signal 0 only probes for existence.
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }

    #[tokio::test]
    async fn client_disconnect_kills_encoder_process() {
        let launcher = Arc::new(HangingLauncher::new());
        let (h, addr) = TestHarness::with_server_parts(
            Arc::new(FakeProber::with_codec("h264")),
            launcher.clone(),
        )
        .await;
        h.write_media("movie.mp4", &vec![0u8; 64]);

        let client = reqwest::Client::new();
        let mut resp = client
            .get(format!("http://{addr}/transcode/movie.mp4"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        // Read one chunk to prove the session is live, then hang up.
        let first = resp.chunk().await.unwrap();
        assert!(first.is_some());
        let pid = launcher.pid().expect("encoder should have been spawned");
        assert!(pid_running(pid));

        drop(resp);

        // The encoder must be terminated and reaped within the grace window.
        let deadline = Instant::now() + Duration::from_secs(8);
        while pid_running(pid) {
            assert!(
                Instant::now() < deadline,
                "encoder process outlived its client connection"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

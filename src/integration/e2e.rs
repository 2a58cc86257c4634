//! End-to-end tests: orchestrator, HTTP transport and playback together

use crate::config::{ClientConfig, PlayerConfig};
use crate::cue::Cue;
use crate::error::{SyncError, ValidationError};
use crate::integration::fixtures::{
    refused_url, sample_png, sample_vtt, sample_wav, MockServer, Reply, SAMPLE_VTT,
};
use crate::playback::PlaybackController;
use crate::upload::{HttpTransport, UploadFile, UploadKind, UploadOrchestrator};
use std::time::{Duration, Instant};

fn orchestrator(base_url: &str) -> UploadOrchestrator<HttpTransport> {
    let mut config = ClientConfig::with_base_url(base_url);
    config.upload.chunk_size = 16 * 1024;
    let transport = HttpTransport::new(&config).unwrap();
    UploadOrchestrator::new(transport, config)
}

fn expected_cues() -> Vec<Cue> {
    vec![
        Cue::new(0.0, 2.0, "a").unwrap(),
        Cue::new(2.0, 5.0, "b").unwrap(),
    ]
}

#[tokio::test]
async fn test_full_submission_drives_playback() {
    let server = MockServer::start().await;
    let orch = orchestrator(&server.base_url);

    let outcome = orch
        .submit(
            Some(sample_wav(4096)),
            Some(sample_vtt(SAMPLE_VTT)),
            Some(sample_png()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        server.received_kinds(),
        vec![UploadKind::Audio, UploadKind::Subtitle, UploadKind::Image]
    );
    let received = server.received();
    assert_eq!(received[0].filename, "song.wav");
    assert_eq!(received[0].bytes, 4096);
    assert_eq!(received[0].content_type.as_deref(), Some("audio/wav"));

    assert_eq!(outcome.cues(), expected_cues().as_slice());
    let audio_url = format!("{}/api/files/audio/song.wav", server.base_url);
    let image_url = format!("{}/api/files/image/cover.png", server.base_url);
    assert_eq!(outcome.audio_url(), Some(audio_url.as_str()));
    assert_eq!(outcome.image_url(), Some(image_url.as_str()));

    let mut player = PlaybackController::new(&PlayerConfig::default());
    let mut subtitles = player.subscribe_subtitles();
    player.load_outcome(&outcome).unwrap();
    player.on_metadata(5.0);
    player.toggle_play_pause();

    player.on_time_update(1.0);
    assert_eq!(*subtitles.borrow_and_update(), "a");
    player.on_time_update(2.0);
    assert_eq!(*subtitles.borrow_and_update(), "b");
    player.on_ended();
    assert_eq!(*subtitles.borrow_and_update(), "");
}

#[tokio::test]
async fn test_fetch_cues_after_upload() {
    let server = MockServer::start().await;
    let orch = orchestrator(&server.base_url);
    orch.submit(Some(sample_wav(64)), Some(sample_vtt(SAMPLE_VTT)), None, None)
        .await
        .unwrap();

    let cues = orch.transport().fetch_cues("song.vtt").await.unwrap();
    assert_eq!(cues, expected_cues());

    let err = orch.transport().fetch_cues("missing.vtt").await.unwrap_err();
    assert!(matches!(err, SyncError::Http { status: 404, .. }));
    assert_eq!(err.to_string(), "Subtitle file not found");
}

#[tokio::test]
async fn test_status_without_json_detail() {
    let server = MockServer::start().await;
    server.script(UploadKind::Audio, Reply::Raw(413, "Request Entity Too Large"));
    let orch = orchestrator(&server.base_url);

    let err = orch
        .submit(Some(sample_wav(64)), Some(sample_vtt(SAMPLE_VTT)), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Http { kind: UploadKind::Audio, status: 413, detail: None }
    ));
    assert!(err.to_string().contains("too large"));
    assert_eq!(server.received_kinds(), vec![UploadKind::Audio]);
}

#[tokio::test]
async fn test_server_detail_is_shown() {
    let server = MockServer::start().await;
    server.script(UploadKind::Image, Reply::Detail(400, "Unsupported image"));
    let orch = orchestrator(&server.base_url);

    let err = orch
        .submit(
            Some(sample_wav(64)),
            Some(sample_vtt(SAMPLE_VTT)),
            Some(sample_png()),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unsupported image");
    assert_eq!(err.stage(), Some(UploadKind::Image));
    // Audio and subtitle stay on the server
    assert_eq!(server.received().len(), 3);
}

#[tokio::test]
async fn test_invalid_vtt_rejected_by_server() {
    let server = MockServer::start().await;
    let orch = orchestrator(&server.base_url);

    let err = orch
        .submit(Some(sample_wav(64)), Some(sample_vtt("not a subtitle")), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Http { kind: UploadKind::Subtitle, status: 400, detail: Some(_) }
    ));
    assert_eq!(server.received_kinds(), vec![UploadKind::Audio, UploadKind::Subtitle]);
}

#[tokio::test]
async fn test_non_json_success_is_decode_error() {
    let server = MockServer::start().await;
    server.script(UploadKind::Audio, Reply::Raw(200, "OK"));
    let orch = orchestrator(&server.base_url);

    let err = orch
        .submit(Some(sample_wav(64)), Some(sample_vtt(SAMPLE_VTT)), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Decode { kind: UploadKind::Audio, .. }));
    assert_eq!(server.received_kinds(), vec![UploadKind::Audio]);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let orch = orchestrator(&refused_url().await);
    let err = orch
        .submit(Some(sample_wav(64)), Some(sample_vtt(SAMPLE_VTT)), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Transport { kind: UploadKind::Audio, .. }));
    assert!(!orch.is_busy());
}

#[tokio::test]
async fn test_header_only_subtitle_is_empty_result() {
    let server = MockServer::start().await;
    let orch = orchestrator(&server.base_url);

    let err = orch
        .submit(
            Some(sample_wav(64)),
            Some(sample_vtt("WEBVTT\n\n")),
            Some(sample_png()),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::EmptyResult));
    assert_eq!(server.received_kinds(), vec![UploadKind::Audio, UploadKind::Subtitle]);
}

#[tokio::test]
async fn test_oversized_audio_never_reaches_server() {
    let server = MockServer::start().await;
    let orch = orchestrator(&server.base_url);

    let huge = UploadFile::with_declared_size("huge.wav", 3 * 1024 * 1024 * 1024);
    let err = orch
        .submit(Some(huge), Some(sample_vtt(SAMPLE_VTT)), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::TooLarge { kind: UploadKind::Audio, .. })
    ));
    assert!(err.is_local());
    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let server = MockServer::start().await;
    let orch = orchestrator(&server.base_url);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    orch.submit(
        Some(sample_wav(100 * 1024)),
        Some(sample_vtt(SAMPLE_VTT)),
        None,
        Some(tx),
    )
    .await
    .unwrap();

    // Every chunk was counted before its response arrived
    let mut audio = Vec::new();
    let mut subtitle = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event.kind {
            UploadKind::Audio => audio.push(event),
            UploadKind::Subtitle => subtitle.push(event),
            UploadKind::Image => panic!("no image was submitted"),
        }
    }

    // 100 KiB in 16 KiB chunks
    assert_eq!(audio.len(), 7);
    assert!(audio.windows(2).all(|w| w[0].bytes_sent <= w[1].bytes_sent));
    let last = audio.last().unwrap();
    assert_eq!(last.bytes_sent, 100 * 1024);
    assert_eq!(last.percent(), 100);

    assert_eq!(subtitle.last().unwrap().bytes_sent, SAMPLE_VTT.len() as u64);
}

#[tokio::test]
async fn test_slow_upload_outlasting_idle_window_completes() {
    let server = MockServer::start().await;
    // 512 KiB read at 64 KiB per 200 ms takes about 1.6 s
    server.throttle(Duration::from_millis(200));

    let mut config = ClientConfig::with_base_url(&server.base_url);
    config.upload.chunk_size = 16 * 1024;
    config.upload.idle_timeout_secs = 1;
    let orch = UploadOrchestrator::new(HttpTransport::new(&config).unwrap(), config);

    let started = Instant::now();
    let outcome = orch
        .submit(
            Some(sample_wav(512 * 1024)),
            Some(sample_vtt(SAMPLE_VTT)),
            None,
            None,
        )
        .await
        .unwrap();

    assert!(started.elapsed() > Duration::from_secs(1));
    assert_eq!(outcome.cues(), expected_cues().as_slice());
    let received = server.received();
    assert_eq!(received[0].kind, UploadKind::Audio);
    assert_eq!(received[0].bytes, 512 * 1024);
}

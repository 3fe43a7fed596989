//! End-to-end tests for the HTTP surface over the simulated drivers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;

use argus::audio::AudioRing;
use argus::capture::sim::{SimSensor, SimShared};
use argus::capture::{FrameSize, FrameSource};
use argus::state::DeviceState;
use argus::storage::PhotoSlot;
use argus::web::{router, AppState};
use argus::{CameraBackend, CameraConfig, GrabPolicy};

struct TestNode {
    app: axum::Router,
    shared: Arc<SimShared>,
    state: Arc<DeviceState>,
    ring: Arc<Mutex<AudioRing>>,
    restart_rx: mpsc::Receiver<()>,
    _dir: tempfile::TempDir,
}

fn camera_config() -> CameraConfig {
    CameraConfig {
        backend: CameraBackend::Simulated,
        device_path: String::new(),
        max_frame_size: FrameSize::Svga,
        baseline_frame_size: FrameSize::Qvga,
        jpeg_quality: 70,
        buffer_count: 2,
        grab_policy: GrabPolicy::WhenEmpty,
    }
}

fn build_node(init_camera: bool) -> TestNode {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(DeviceState::new("test-node".into()));

    let sensor = SimSensor::new();
    let shared = sensor.shared();
    let mut camera = FrameSource::new(Box::new(sensor), camera_config(), Arc::clone(&state));
    if init_camera {
        camera.initialize().unwrap();
    }

    let ring = Arc::new(Mutex::new(AudioRing::new(4096)));
    let (restart_tx, restart_rx) = mpsc::channel(1);

    let app_state = Arc::new(AppState {
        device: Arc::clone(&state),
        camera: Arc::new(Mutex::new(camera)),
        audio: Arc::clone(&ring),
        slot: PhotoSlot::new(dir.path().join("photo.jpg")),
        restart: restart_tx,
    });

    TestNode {
        app: router(app_state),
        shared,
        state,
        ring,
        restart_rx,
        _dir: dir,
    }
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Option<String>, Bytes) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, body)
}

#[tokio::test]
async fn status_before_bringup_reports_nothing_ready() {
    let node = build_node(false);

    let (status, _, body) = get(&node.app, "/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["camera_ready"], false);
    assert_eq!(json["mic_ready"], false);
    assert_eq!(json["frame_count"], 0);
    assert_eq!(json["device"], "test-node");
}

#[tokio::test]
async fn status_flips_after_bringup() {
    let node = build_node(true);
    node.state.set_mic_ready(true);

    let (_, _, body) = get(&node.app, "/status").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["camera_ready"], true);
    assert_eq!(json["mic_ready"], true);
}

#[tokio::test]
async fn saved_photo_without_capture_is_404_with_empty_body() {
    let node = build_node(true);

    let (status, _, body) = get(&node.app, "/saved_photo").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn video_jpeg_streams_a_frame() {
    let node = build_node(true);

    let (status, content_type, body) = get(&node.app, "/video.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(&body[..2], b"\xFF\xD8");
    assert_eq!(node.state.snapshot().frame_count, 1);
}

#[tokio::test]
async fn video_jpeg_before_camera_init_is_503() {
    let node = build_node(false);

    let (status, _, body) = get(&node.app, "/video.jpg").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(&body[..], b"camera not initialized");
}

#[tokio::test]
async fn capture_then_saved_photo_roundtrips_bytes() {
    let node = build_node(true);

    let (status, _, confirmation) = get(&node.app, "/capture").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&confirmation).starts_with("photo captured"));

    let (status, content_type, saved) = get(&node.app, "/saved_photo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));

    // The simulated sensor serves a deterministic test card, so the slot
    // must hold exactly what a direct capture returns.
    let (_, _, live) = get(&node.app, "/video.jpg").await;
    assert_eq!(saved, live);
}

#[tokio::test]
async fn double_fault_yields_503_and_unchanged_counter() {
    let node = build_node(true);

    node.shared.push_faults([true, true]);
    let (status, _, body) = get(&node.app, "/video.jpg").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(&body[..], b"camera capture failed");
    assert_eq!(node.state.snapshot().frame_count, 0);
}

#[tokio::test]
async fn hundred_captures_with_periodic_first_attempt_faults() {
    let node = build_node(true);

    for i in 0..100u32 {
        if i % 10 == 0 {
            node.shared.push_faults([true]);
        }
        let (status, _, _) = get(&node.app, "/video.jpg").await;
        assert_eq!(status, StatusCode::OK, "capture {i} failed");
    }

    assert_eq!(node.state.snapshot().frame_count, 100);
    assert_eq!(node.shared.outstanding(), 0, "leaked pool buffers");
}

#[tokio::test]
async fn audio_before_mic_init_is_503() {
    let node = build_node(true);

    let (status, _, _) = get(&node.app, "/audio").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn audio_window_returns_wav() {
    let node = build_node(true);
    node.state.set_mic_ready(true);
    node.ring.lock().await.push(&[0u8; 512]);

    let (status, content_type, body) = get(&node.app, "/audio").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("audio/wav"));
    assert_eq!(&body[..4], b"RIFF");
    assert_eq!(body.len(), 44 + 512);
}

#[tokio::test]
async fn restart_acknowledges_then_signals_shutdown() {
    let mut node = build_node(true);

    let (status, _, body) = get(&node.app, "/restart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"restarting device");
    assert!(node.restart_rx.try_recv().is_ok());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let node = build_node(true);

    let (status, _, body) = get(&node.app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(&body[..], b"404 - not found");
}

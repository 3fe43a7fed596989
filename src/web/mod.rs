//! HTTP surface: axum routes mapping the companion poller's operations onto
//! the capture and audio subsystems.
//!
//! - `GET /`: status/preview page
//! - `GET /video.jpg`: capture one frame, stream it
//! - `GET /capture`: capture one frame into the photo slot
//! - `GET /saved_photo`: stream the photo slot
//! - `GET /audio`: current rolling audio window as WAV
//! - `GET /status`: JSON device status
//! - `GET /restart`: acknowledge, then shut down for the supervisor

pub mod error;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tokio::sync::{mpsc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::audio::{self, AudioRing};
use crate::capture::FrameSource;
use crate::state::DeviceState;
use crate::storage::PhotoSlot;

/// Shared state for the request handlers.
///
/// The frame-source mutex is what serializes hardware access: whichever
/// request holds it owns the sensor pool until its capture completes.
pub struct AppState {
    pub device: Arc<DeviceState>,
    pub camera: Arc<Mutex<FrameSource>>,
    pub audio: Arc<Mutex<AudioRing>>,
    pub slot: PhotoSlot,
    pub restart: mpsc::Sender<()>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video.jpg", get(video_jpeg))
        .route("/capture", get(capture_photo))
        .route("/saved_photo", get(saved_photo))
        .route("/audio", get(audio_window))
        .route("/status", get(status))
        .route("/restart", get(restart))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until a restart request arrives on `restart_rx`.
pub async fn serve(
    state: Arc<AppState>,
    bind: SocketAddr,
    mut restart_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    info!("HTTP server listening on http://{bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = restart_rx.recv() => info!("restart requested, shutting down HTTP server"),
                _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down HTTP server"),
            }
        })
        .await
        .wrap_err("HTTP server error")?;

    Ok(())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>Argus Monitor</title>
  <style>
    body { font-family: sans-serif; max-width: 720px; margin: 2em auto; }
    img { width: 100%; background: #000; border-radius: 6px; }
    a { margin-right: 1em; }
  </style>
</head>
<body>
  <h1>Argus Capture Node</h1>
  <img id="stream" src="/video.jpg" alt="camera">
  <p>
    <a href="/capture">Capture photo</a>
    <a href="/saved_photo">Saved photo</a>
    <a href="/status">Status</a>
    <a href="/restart">Restart</a>
  </p>
  <script>
    setInterval(() => {
      document.getElementById('stream').src = '/video.jpg?t=' + Date.now();
    }, 1000);
  </script>
</body>
</html>
"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn video_jpeg(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let frame = state.camera.lock().await.capture()?;
    debug!(
        sequence = frame.sequence,
        bytes = frame.data.len(),
        "frame served"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        frame.data,
    )
        .into_response())
}

async fn capture_photo(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    let frame = state.camera.lock().await.capture()?;
    state.slot.write(&frame.data).await?;

    info!(bytes = frame.data.len(), "photo captured to slot");
    Ok(format!("photo captured ({} bytes)", frame.data.len()))
}

async fn saved_photo(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let data = state.slot.read().await?.ok_or(ApiError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], data).into_response())
}

async fn audio_window(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    if !state.device.mic_ready() {
        return Err(ApiError::ServiceUnavailable(
            "microphone not initialized".into(),
        ));
    }

    let pcm = {
        let ring = state.audio.lock().await;
        if !ring.is_ready() {
            return Err(ApiError::ServiceUnavailable("no audio captured yet".into()));
        }
        ring.snapshot()
    };

    let cfg = crate::CONFIG.load();
    let wav = audio::wav_container(&pcm, cfg.audio.sample_rate, cfg.audio.channels)?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], wav).into_response())
}

async fn status(State(state): State<Arc<AppState>>) -> Json<crate::state::StatusSnapshot> {
    Json(state.device.snapshot())
}

async fn restart(State(state): State<Arc<AppState>>) -> &'static str {
    info!("restart requested over HTTP");
    let _ = state.restart.try_send(());
    "restarting device"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 - not found")
}

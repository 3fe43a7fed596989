//! Argus capture node: camera and microphone behind a small HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use argus::audio::mic::CpalMic;
use argus::audio::sim::SimMic;
use argus::audio::{sampler, AudioRing, MicDriver};
use argus::capture::sensor::SensorDriver;
use argus::capture::sim::SimSensor;
use argus::capture::v4l2::{self, V4l2Sensor};
use argus::capture::FrameSource;
use argus::state::DeviceState;
use argus::storage::PhotoSlot;
use argus::web::{self, AppState};
use argus::{monitor, net, AudioBackend, CameraBackend, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argus=debug".into()),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Argus capture node starting");

    let config = Config::load()?;
    argus::CONFIG.store(Arc::new(config.clone()));

    let state = Arc::new(DeviceState::new(config.server.device_id.clone()));

    // Network, then camera, then microphone: the same bring-up order the
    // firmware used, so status flags flip in a predictable sequence.
    if let Some(network) = net::join(Duration::from_secs(config.server.network_wait_secs)).await {
        state.set_network(network.ip, network.signal_dbm);
    }

    let driver: Box<dyn SensorDriver> = match config.camera.backend {
        CameraBackend::V4l2 => {
            let path = if config.camera.device_path.is_empty() {
                match v4l2::detect_device() {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("{e}; falling back to /dev/video0");
                        "/dev/video0".into()
                    }
                }
            } else {
                config.camera.device_path.clone()
            };
            Box::new(V4l2Sensor::new(path))
        }
        CameraBackend::Simulated => Box::new(SimSensor::new()),
    };

    let mut camera = FrameSource::new(driver, config.camera.clone(), state.clone());
    if let Err(e) = camera.initialize() {
        // Keep serving: status reports camera_ready=false and capture
        // requests answer with a failure status.
        error!("camera initialization failed: {e}");
    }
    let camera = Arc::new(Mutex::new(camera));

    let mut mic: Box<dyn MicDriver> = match config.audio.backend {
        AudioBackend::Cpal => Box::new(CpalMic::new()),
        AudioBackend::Simulated => Box::new(SimMic::new()),
    };
    match mic.start(&config.audio) {
        Ok(()) => state.set_mic_ready(true),
        Err(e) => error!("microphone initialization failed: {e}"),
    }

    let ring = Arc::new(Mutex::new(AudioRing::new(config.audio.ring_capacity_bytes)));
    let _sampler = sampler::spawn(
        mic,
        Arc::clone(&ring),
        Arc::clone(&state),
        Duration::from_millis(config.audio.cadence_ms),
    );
    let _monitor = monitor::spawn(
        Arc::clone(&state),
        Duration::from_secs(config.server.monitor_interval_secs),
    );

    let (restart_tx, restart_rx) = mpsc::channel(1);
    let app_state = Arc::new(AppState {
        device: state,
        camera,
        audio: ring,
        slot: PhotoSlot::new(config.storage.photo_path.clone()),
        restart: restart_tx,
    });

    let bind: SocketAddr = config.server.bind.parse()?;
    web::serve(app_state, bind, restart_rx).await?;

    // Reaching here means a restart was requested; the supervisor brings the
    // process back up.
    info!("Argus shutting down");
    Ok(())
}

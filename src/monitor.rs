//! Periodic liveness bookkeeping, independent of the request path.
//!
//! Reads device state only; it must never touch the camera, which would
//! contend with request-triggered captures.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::DeviceState;

pub fn spawn(state: Arc<DeviceState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately; skip it so the startup logs
        // aren't duplicated.
        interval.tick().await;

        loop {
            interval.tick().await;
            let snap = state.snapshot();
            debug!(
                network = snap.network_joined,
                camera = snap.camera_ready,
                mic = snap.mic_ready,
                frames = snap.frame_count,
                audio_bytes = snap.audio_bytes_captured,
                uptime_secs = snap.uptime_secs,
                "capture node alive"
            );
        }
    })
}

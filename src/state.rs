//! Process-wide device status.
//!
//! One struct shared by `Arc`; each field is written by exactly one
//! subsystem (network join sets the network fields, the frame source the
//! camera fields, the sampler the audio counter) and read by anyone.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::Serialize;

pub struct DeviceState {
    device_id: String,
    started_at: Instant,

    network_joined: AtomicBool,
    ip_addr: OnceCell<IpAddr>,
    signal_dbm: AtomicI32,

    camera_ready: AtomicBool,
    mic_ready: AtomicBool,

    frame_count: AtomicU64,
    audio_bytes: AtomicU64,
}

/// Point-in-time copy of every status field, shaped for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub device: String,
    pub firmware_version: &'static str,
    pub network_joined: bool,
    pub ip_address: String,
    pub camera_ready: bool,
    pub mic_ready: bool,
    pub frame_count: u64,
    pub audio_bytes_captured: u64,
    pub signal_dbm: i32,
    pub uptime_secs: u64,
}

impl DeviceState {
    pub fn new(device_id: String) -> Self {
        Self {
            device_id,
            started_at: Instant::now(),
            network_joined: AtomicBool::new(false),
            ip_addr: OnceCell::new(),
            signal_dbm: AtomicI32::new(0),
            camera_ready: AtomicBool::new(false),
            mic_ready: AtomicBool::new(false),
            frame_count: AtomicU64::new(0),
            audio_bytes: AtomicU64::new(0),
        }
    }

    /// Written once by the network-join routine at startup.
    pub fn set_network(&self, ip: IpAddr, signal_dbm: Option<i32>) {
        let _ = self.ip_addr.set(ip);
        if let Some(dbm) = signal_dbm {
            self.signal_dbm.store(dbm, Ordering::Relaxed);
        }
        self.network_joined.store(true, Ordering::Relaxed);
    }

    pub fn set_camera_ready(&self, ready: bool) {
        self.camera_ready.store(ready, Ordering::Relaxed);
    }

    pub fn set_mic_ready(&self, ready: bool) {
        self.mic_ready.store(ready, Ordering::Relaxed);
    }

    pub fn mic_ready(&self) -> bool {
        self.mic_ready.load(Ordering::Relaxed)
    }

    pub fn record_frame(&self) {
        self.frame_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_audio_bytes(&self, n: u64) {
        self.audio_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            device: self.device_id.clone(),
            firmware_version: env!("CARGO_PKG_VERSION"),
            network_joined: self.network_joined.load(Ordering::Relaxed),
            ip_address: self
                .ip_addr
                .get()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "0.0.0.0".into()),
            camera_ready: self.camera_ready.load(Ordering::Relaxed),
            mic_ready: self.mic_ready.load(Ordering::Relaxed),
            frame_count: self.frame_count.load(Ordering::Relaxed),
            audio_bytes_captured: self.audio_bytes.load(Ordering::Relaxed),
            signal_dbm: self.signal_dbm.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_flags_start_false_and_flip_on_bringup() {
        let state = DeviceState::new("node".into());
        let snap = state.snapshot();
        assert!(!snap.camera_ready);
        assert!(!snap.mic_ready);

        state.set_camera_ready(true);
        state.set_mic_ready(true);

        let snap = state.snapshot();
        assert!(snap.camera_ready);
        assert!(snap.mic_ready);
    }

    #[test]
    fn network_fields_write_once() {
        let state = DeviceState::new("node".into());
        state.set_network("192.168.1.20".parse().unwrap(), Some(-56));
        state.set_network("10.0.0.9".parse().unwrap(), None);

        let snap = state.snapshot();
        assert_eq!(snap.ip_address, "192.168.1.20");
        assert_eq!(snap.signal_dbm, -56);
        assert!(snap.network_joined);
    }
}

pub mod audio;
pub mod capture;
pub mod monitor;
pub mod net;
pub mod state;
pub mod storage;
pub mod web;

use std::path::PathBuf;

use arc_swap::ArcSwap;
use capture::frame::FrameSize;
use serde::{Deserialize, Serialize};

/// Global configuration, stored once at startup
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub device_id: String,
    pub bind: String,
    /// How long to wait for a routable address before serving anyway
    pub network_wait_secs: u64,
    pub monitor_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    V4l2,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabPolicy {
    /// Fill a pool buffer only when one is free
    WhenEmpty,
    /// Always grab the most recent frame
    Latest,
}

/// Immutable-after-init camera descriptor. Reinitialization after a fault
/// reuses this verbatim, so recovery lands in a known mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub backend: CameraBackend,
    /// Empty means auto-detect
    pub device_path: String,
    pub max_frame_size: FrameSize,
    /// Mode forced after bring-up; kept below the maximum for stability
    pub baseline_frame_size: FrameSize,
    pub jpeg_quality: u8,
    pub buffer_count: u32,
    pub grab_policy: GrabPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    Cpal,
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub backend: AudioBackend,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    /// Capacity of the shared rolling window
    pub ring_capacity_bytes: usize,
    /// Capacity of the driver-side buffer the callback fills
    pub driver_buffer_bytes: usize,
    pub cadence_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub photo_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            device_id: "argus-node".into(),
            bind: "0.0.0.0:8080".into(),
            network_wait_secs: 30,
            monitor_interval_secs: 30,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackend::V4l2,
            device_path: String::new(),
            max_frame_size: FrameSize::Uxga,
            baseline_frame_size: FrameSize::Vga,
            jpeg_quality: 80,
            buffer_count: 2,
            grab_policy: GrabPolicy::WhenEmpty,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: AudioBackend::Cpal,
            sample_rate: 16_000,
            bits_per_sample: 16,
            channels: 1,
            ring_capacity_bytes: 64 * 1024, // ~2s of 16 kHz 16-bit mono
            driver_buffer_bytes: 32 * 1024,
            cadence_ms: 100,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            photo_path: PathBuf::from("photo.jpg"),
        }
    }
}

impl Config {
    /// Load from the TOML file named by `ARGUS_CONFIG` (default
    /// `argus.toml`), then `ARGUS`-prefixed environment overrides
    /// (e.g. `ARGUS_SERVER__BIND`). Missing file or fields fall back to
    /// defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("ARGUS_CONFIG").unwrap_or_else(|_| "argus.toml".into());

        config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("ARGUS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

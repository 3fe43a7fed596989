//! Simulated sensor for development boards without a camera and for tests.
//!
//! Renders a gradient test card once per mode change and hands out copies of
//! it, with the same pool accounting and "no frame" behavior a real driver
//! exhibits. Faults can be scripted through the shared handle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::{debug, info};

use crate::CameraConfig;

use super::frame::FrameSize;
use super::sensor::{RawFrame, SensorDriver, SensorError};

/// Counters and fault script, observable from outside the boxed driver.
#[derive(Debug, Default)]
pub struct SimShared {
    /// Queue of scripted grab outcomes; `true` means "report no frame".
    faults: Mutex<VecDeque<bool>>,
    grabs: AtomicU64,
    power_ups: AtomicU64,
    outstanding: AtomicU32,
}

impl SimShared {
    /// Script the next grab calls; `true` entries yield "no frame".
    pub fn push_faults(&self, outcomes: impl IntoIterator<Item = bool>) {
        let mut faults = self
            .faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        faults.extend(outcomes);
    }

    pub fn grabs(&self) -> u64 {
        self.grabs.load(Ordering::Relaxed)
    }

    pub fn power_ups(&self) -> u64 {
        self.power_ups.load(Ordering::Relaxed)
    }

    /// Pool buffers currently held by callers. Zero means no leaks.
    pub fn outstanding(&self) -> u32 {
        self.outstanding.load(Ordering::Relaxed)
    }

    fn next_fault(&self) -> bool {
        let mut faults = self
            .faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        faults.pop_front().unwrap_or(false)
    }
}

pub struct SimSensor {
    shared: Arc<SimShared>,
    powered: bool,
    pool_size: u32,
    frame_size: FrameSize,
    jpeg_quality: u8,
    test_card: Bytes,
}

impl SimSensor {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SimShared::default()),
            powered: false,
            pool_size: 0,
            frame_size: FrameSize::Vga,
            jpeg_quality: 80,
            test_card: Bytes::new(),
        }
    }

    /// Handle for fault injection and pool inspection; grab it before the
    /// sensor is boxed behind the trait.
    pub fn shared(&self) -> Arc<SimShared> {
        Arc::clone(&self.shared)
    }

    fn render_test_card(&mut self) -> Result<(), SensorError> {
        let (width, height) = self.frame_size.dimensions();

        let img = image::RgbImage::from_fn(width, height, |x, y| {
            let r = (255 * x / width.max(1)) as u8;
            let g = (255 * y / height.max(1)) as u8;
            let b = (255 * (x + y) / (width + height).max(1)) as u8;
            image::Rgb([r, g, b])
        });

        let mut jpeg = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
        encoder
            .encode(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| SensorError::InvalidState(format!("test card encode: {e}")))?;

        debug!(width, height, bytes = jpeg.len(), "rendered test card");
        self.test_card = Bytes::from(jpeg);
        Ok(())
    }
}

impl Default for SimSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for SimSensor {
    fn power_up(&mut self, config: &CameraConfig) -> Result<(), SensorError> {
        self.pool_size = config.buffer_count;
        self.frame_size = config.max_frame_size;
        self.jpeg_quality = config.jpeg_quality;
        self.render_test_card()?;
        self.powered = true;
        self.shared.power_ups.fetch_add(1, Ordering::Relaxed);
        self.shared.outstanding.store(0, Ordering::Relaxed);
        info!(pool = self.pool_size, "simulated sensor powered up");
        Ok(())
    }

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), SensorError> {
        if !self.powered {
            return Err(SensorError::InvalidState("sensor not powered".into()));
        }
        if self.frame_size != size {
            self.frame_size = size;
            self.render_test_card()?;
        }
        Ok(())
    }

    fn grab(&mut self) -> Result<Option<RawFrame>, SensorError> {
        if !self.powered {
            return Err(SensorError::InvalidState("sensor not powered".into()));
        }

        self.shared.grabs.fetch_add(1, Ordering::Relaxed);

        if self.shared.next_fault() {
            return Ok(None);
        }

        // An exhausted pool looks exactly like transient contention.
        if self.shared.outstanding.load(Ordering::Relaxed) >= self.pool_size {
            return Ok(None);
        }

        self.shared.outstanding.fetch_add(1, Ordering::Relaxed);
        let (width, height) = self.frame_size.dimensions();
        Ok(Some(RawFrame {
            data: self.test_card.clone(),
            width,
            height,
        }))
    }

    fn retire(&mut self, frame: RawFrame) {
        drop(frame);
        let prev = self.shared.outstanding.load(Ordering::Relaxed);
        self.shared
            .outstanding
            .store(prev.saturating_sub(1), Ordering::Relaxed);
    }

    fn power_down(&mut self) {
        self.powered = false;
        self.shared.outstanding.store(0, Ordering::Relaxed);
    }
}

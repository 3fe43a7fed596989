//! Frame-buffer lifecycle management with one-shot failure recovery.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::state::DeviceState;
use crate::CameraConfig;

use super::frame::Frame;
use super::sensor::{SensorDriver, SensorError};

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera not initialized")]
    NotInitialized,

    /// Acquisition failed even after the reinitialize-and-retry attempt.
    #[error("camera hardware unavailable")]
    HardwareUnavailable,

    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// Owns the sensor driver, the stored configuration it was brought up with,
/// and the recovery policy applied when the driver reports "no frame".
pub struct FrameSource {
    driver: Box<dyn SensorDriver>,
    config: CameraConfig,
    state: Arc<DeviceState>,
    sequence: u64,
    initialized: bool,
}

impl FrameSource {
    pub fn new(driver: Box<dyn SensorDriver>, config: CameraConfig, state: Arc<DeviceState>) -> Self {
        Self {
            driver,
            config,
            state,
            sequence: 0,
            initialized: false,
        }
    }

    /// Power the sensor up at the configured maximum mode, then drop to the
    /// baseline mode, trading sharpness for reliability. Finishes with one
    /// probe grab so a wedged sensor is caught at bring-up instead of on the
    /// first request.
    pub fn initialize(&mut self) -> Result<(), CameraError> {
        self.driver.power_up(&self.config)?;
        self.driver.set_frame_size(self.config.baseline_frame_size)?;

        match self.driver.grab()? {
            Some(probe) => {
                debug!(
                    bytes = probe.data.len(),
                    width = probe.width,
                    height = probe.height,
                    "probe capture ok"
                );
                self.driver.retire(probe);
            }
            None => warn!("probe capture returned no frame; continuing"),
        }

        self.initialized = true;
        self.state.set_camera_ready(true);
        info!(baseline = ?self.config.baseline_frame_size, "camera initialized");
        Ok(())
    }

    /// Tear down and rebuild the sensor from the stored configuration.
    /// Used exactly once per failed grab, never in a loop. The ready flag
    /// only drops if the rebuild fails; a successful recovery is invisible
    /// to status readers.
    pub fn reinitialize(&mut self) -> Result<(), CameraError> {
        info!("reinitializing sensor");
        self.driver.power_down();

        let rebuilt = match self.driver.power_up(&self.config) {
            Ok(()) => self.driver.set_frame_size(self.config.baseline_frame_size),
            Err(e) => Err(e),
        };

        match rebuilt {
            Ok(()) => {
                self.initialized = true;
                self.state.set_camera_ready(true);
                Ok(())
            }
            Err(e) => {
                self.initialized = false;
                self.state.set_camera_ready(false);
                Err(e.into())
            }
        }
    }

    /// One logical acquisition: grab, and on "no frame" reinitialize once
    /// and retry once. The pool buffer is retired before this returns, on
    /// every path, so callers can never leak it.
    pub fn capture(&mut self) -> Result<Frame, CameraError> {
        if !self.initialized {
            return Err(CameraError::NotInitialized);
        }

        let raw = match self.driver.grab()? {
            Some(raw) => raw,
            None => {
                warn!("sensor returned no frame, attempting one-shot recovery");
                if let Err(e) = self.reinitialize() {
                    warn!("reinitialize failed: {e}");
                    return Err(CameraError::HardwareUnavailable);
                }
                match self.driver.grab()? {
                    Some(raw) => raw,
                    None => return Err(CameraError::HardwareUnavailable),
                }
            }
        };

        let frame = Frame {
            data: raw.data.clone(),
            width: raw.width,
            height: raw.height,
            sequence: self.sequence + 1,
        };
        self.driver.retire(raw);

        self.sequence += 1;
        self.state.record_frame();

        if !frame.looks_like_jpeg() {
            debug!(sequence = frame.sequence, "captured frame lacks JPEG marker");
        }

        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::super::sim::SimSensor;
    use super::*;
    use crate::capture::frame::FrameSize;
    use crate::GrabPolicy;

    fn test_config() -> CameraConfig {
        CameraConfig {
            backend: crate::CameraBackend::Simulated,
            device_path: String::new(),
            max_frame_size: FrameSize::Svga,
            baseline_frame_size: FrameSize::Qvga,
            jpeg_quality: 70,
            buffer_count: 2,
            grab_policy: GrabPolicy::WhenEmpty,
        }
    }

    fn test_source() -> (FrameSource, Arc<super::super::sim::SimShared>, Arc<DeviceState>) {
        let sensor = SimSensor::new();
        let shared = sensor.shared();
        let state = Arc::new(DeviceState::new("test-node".into()));
        let source = FrameSource::new(Box::new(sensor), test_config(), state.clone());
        (source, shared, state)
    }

    #[test]
    fn capture_before_initialize_is_rejected() {
        let (mut source, _, state) = test_source();
        assert!(matches!(
            source.capture(),
            Err(CameraError::NotInitialized)
        ));
        assert_eq!(state.snapshot().frame_count, 0);
    }

    #[test]
    fn capture_retires_pool_buffer() {
        let (mut source, shared, _) = test_source();
        source.initialize().unwrap();

        let before = shared.outstanding();
        let frame = source.capture().unwrap();
        assert!(frame.looks_like_jpeg());
        assert_eq!(shared.outstanding(), before, "pool buffer leaked");
    }

    #[test]
    fn double_failure_reports_hardware_unavailable() {
        let (mut source, shared, state) = test_source();
        source.initialize().unwrap();

        shared.push_faults([true, true]);
        assert!(matches!(
            source.capture(),
            Err(CameraError::HardwareUnavailable)
        ));
        assert_eq!(state.snapshot().frame_count, 0);
        assert_eq!(shared.outstanding(), 0);
    }

    #[test]
    fn recovery_on_retry_counts_one_capture() {
        let (mut source, shared, state) = test_source();
        source.initialize().unwrap();

        let reinits_before = shared.power_ups();
        shared.push_faults([true]);
        let frame = source.capture().unwrap();

        assert!(frame.looks_like_jpeg());
        assert_eq!(state.snapshot().frame_count, 1);
        assert_eq!(shared.power_ups(), reinits_before + 1);
        assert_eq!(shared.outstanding(), 0);
    }

    #[test]
    fn hundred_captures_with_periodic_faults() {
        let (mut source, shared, state) = test_source();
        source.initialize().unwrap();

        for i in 0..100u32 {
            // Every tenth first attempt fails, always recoverable on retry.
            if i % 10 == 0 {
                shared.push_faults([true]);
            }
            source.capture().unwrap();
        }

        assert_eq!(state.snapshot().frame_count, 100);
        assert_eq!(shared.outstanding(), 0, "leaked pool buffers");
    }

    #[test]
    fn recovery_uses_baseline_frame_size() {
        let (mut source, shared, _) = test_source();
        source.initialize().unwrap();

        shared.push_faults([true]);
        let frame = source.capture().unwrap();
        let (w, h) = FrameSize::Qvga.dimensions();
        assert_eq!((frame.width, frame.height), (w, h));
    }
}

//! The hardware seam between the frame source and a concrete camera driver.

use bytes::Bytes;

use crate::CameraConfig;

use super::frame::FrameSize;

/// Why the sensor could not be brought up or serviced.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor not detected")]
    NotDetected,

    #[error("sensor unsupported: {0}")]
    Unsupported(String),

    #[error("insufficient memory for sensor buffers")]
    NoMemory,

    #[error("sensor in invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An unreturned buffer out of the driver's pool.
///
/// Deliberately not `Clone`: exactly one owner holds it until it is handed
/// back through [`SensorDriver::retire`].
#[derive(Debug)]
pub struct RawFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Contract every camera backend implements.
///
/// `grab` returning `Ok(None)` means the driver had no frame to hand out
/// under transient contention; it is not an error and is what triggers the
/// frame source's one-shot recovery. Every `Ok(Some(_))` must be paired with
/// exactly one `retire` or the pool drains until all grabs return `None`.
pub trait SensorDriver: Send {
    /// Configure and power up the sensor at the configured maximum mode.
    fn power_up(&mut self, config: &CameraConfig) -> Result<(), SensorError>;

    /// Switch the active resolution mode. Only valid after `power_up`.
    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), SensorError>;

    /// Attempt to obtain one frame out of the buffer pool.
    fn grab(&mut self) -> Result<Option<RawFrame>, SensorError>;

    /// Hand a grabbed buffer back to the pool.
    fn retire(&mut self, frame: RawFrame);

    /// Tear the driver down, reclaiming all pool buffers.
    fn power_down(&mut self);
}

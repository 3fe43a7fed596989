use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One encoded still capture, owned independently of the sensor's buffer pool.
///
/// By the time a `Frame` exists the pool buffer it came from has already been
/// retired, so holders can keep or drop it freely.
#[derive(Debug, Clone)]
pub struct Frame {
    /// JPEG-encoded image data
    pub data: Bytes,

    pub width: u32,
    pub height: u32,

    /// Monotonic capture sequence number
    pub sequence: u64,
}

impl Frame {
    /// JPEG streams open with the 0xFFD8 start-of-image marker.
    pub fn looks_like_jpeg(&self) -> bool {
        self.data.len() > 2 && self.data[0] == 0xFF && self.data[1] == 0xD8
    }
}

/// Sensor resolution modes we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSize {
    Qvga,
    Vga,
    Svga,
    Xga,
    Uxga,
}

impl FrameSize {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            FrameSize::Qvga => (320, 240),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Uxga => (1600, 1200),
        }
    }
}

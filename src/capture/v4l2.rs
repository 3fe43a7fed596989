//! V4L2 camera backend for boards with a CSI or USB sensor.

use std::io;

use bytes::Bytes;
use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::CameraConfig;

use super::frame::FrameSize;
use super::sensor::{RawFrame, SensorDriver, SensorError};

/// Sensor driver speaking V4L2 with memory-mapped buffers.
pub struct V4l2Sensor {
    path: String,
    device: Option<Box<Device>>,
    stream: Option<MmapStream<'static>>,
    buffer_count: u32,
    frame_size: FrameSize,
    outstanding: u32,
}

impl V4l2Sensor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            device: None,
            stream: None,
            buffer_count: 0,
            frame_size: FrameSize::Vga,
            outstanding: 0,
        }
    }

    fn apply_format(&mut self, size: FrameSize) -> Result<(), SensorError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| SensorError::InvalidState("sensor not powered".into()))?;

        // The stream pins the mmap'd buffers, so it has to go before the
        // format can change.
        self.stream = None;

        let (width, height) = size.dimensions();
        let mut fmt = device.format()?;
        fmt.width = width;
        fmt.height = height;
        fmt.fourcc = FourCC::new(b"MJPG");
        device.set_format(&fmt)?;

        let stream = MmapStream::with_buffers(device, Type::VideoCapture, self.buffer_count)
            .map_err(map_stream_err)?;
        self.stream = Some(stream);
        self.frame_size = size;

        debug!(width, height, buffers = self.buffer_count, "sensor format applied");
        Ok(())
    }
}

impl SensorDriver for V4l2Sensor {
    fn power_up(&mut self, config: &CameraConfig) -> Result<(), SensorError> {
        info!(path = %self.path, policy = ?config.grab_policy, "powering up V4L2 sensor");

        let device = Device::with_path(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SensorError::NotDetected,
            _ => SensorError::Io(e),
        })?;

        let caps = device.query_caps()?;
        info!("sensor: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(SensorError::Unsupported(format!(
                "{} is not a capture device",
                caps.card
            )));
        }

        self.device = Some(Box::new(device));
        self.buffer_count = config.buffer_count;
        self.outstanding = 0;
        self.apply_format(config.max_frame_size)
    }

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), SensorError> {
        self.apply_format(size)
    }

    fn grab(&mut self) -> Result<Option<RawFrame>, SensorError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SensorError::InvalidState("stream not started".into()))?;

        let (buf, _meta) = match stream.next() {
            Ok(pair) => pair,
            // The driver had nothing queued for us; the caller decides
            // whether to recover.
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(None)
            }
            Err(e) => return Err(SensorError::Io(e)),
        };

        if buf.is_empty() {
            return Ok(None);
        }

        let (width, height) = self.frame_size.dimensions();
        let data = Bytes::copy_from_slice(buf);
        self.outstanding += 1;

        Ok(Some(RawFrame {
            data,
            width,
            height,
        }))
    }

    fn retire(&mut self, frame: RawFrame) {
        // The mmap'd buffer was copied out at grab time and requeues on the
        // next dequeue; this just balances the pool accounting.
        drop(frame);
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    fn power_down(&mut self) {
        self.stream = None;
        self.device = None;
        self.outstanding = 0;
        info!(path = %self.path, "V4L2 sensor powered down");
    }
}

fn map_stream_err(e: io::Error) -> SensorError {
    match e.kind() {
        io::ErrorKind::OutOfMemory => SensorError::NoMemory,
        _ => SensorError::Io(e),
    }
}

/// Scan `/dev/video*` for a usable MJPEG-capable capture device.
pub fn detect_device() -> Result<String, SensorError> {
    use std::path::Path;

    info!("auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        if let Ok(dev) = Device::with_path(&path) {
            if let Ok(caps) = dev.query_caps() {
                if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
                    continue;
                }
                if let Ok(formats) = dev.enum_formats() {
                    if formats.iter().any(|f| f.fourcc == FourCC::new(b"MJPG")) {
                        info!("found MJPEG device: {} - {}", path, caps.card);
                        return Ok(path);
                    }
                }
            }
        }
    }

    Err(SensorError::NotDetected)
}

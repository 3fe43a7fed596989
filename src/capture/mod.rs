pub mod frame;
pub mod sensor;
pub mod sim;
pub mod source;
pub mod v4l2;

pub use frame::Frame;
pub use frame::FrameSize;
pub use source::{CameraError, FrameSource};

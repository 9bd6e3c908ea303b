pub mod camera;
pub mod frame;
#[cfg(feature = "camera-nokhwa")]
pub mod frame_converter;
pub mod landmarks;
#[cfg(feature = "camera-nokhwa")]
pub mod nokhwa_device;
pub mod overlay;
pub mod skeleton;
pub mod stream;
pub mod transform;

// Re-exports for convenience
pub use camera::{
    CameraSession, CameraSessionManager, CaptureHints, DeviceOpener, ProbeOutcome, VideoDevice,
};
pub use frame::FramePipeline;
pub use landmarks::{HandposeProvider, LandmarkProvider};
#[cfg(feature = "camera-nokhwa")]
pub use nokhwa_device::NokhwaOpener;
pub use stream::{MjpegStream, StreamChunk, encode_chunk};

pub mod audio;
pub mod codec;
pub mod frame;
pub mod grabber;
pub mod lease;
pub mod source;
#[cfg(feature = "v4l2")]
pub mod v4l2;
pub mod webcam;

pub use audio::{record_audio, AudioClip};
pub use frame::{CapturedFrame, EncodedImage, FrameMetadata, ImageFormat};
pub use grabber::VideoGrabber;
pub use lease::{DeviceLeases, Lease};
pub use source::{open_source, LiveSource, TestPattern};
pub use webcam::Webcam;

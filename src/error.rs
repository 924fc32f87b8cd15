use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = GlimpseError> = std::result::Result<T, E>;

// Main library error type

#[derive(Error, Debug)]
pub enum GlimpseError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Live source has not finished warming up")]
    SurfaceNotReady,
    #[error("Session misuse: {0}")]
    SessionMisuse(&'static str),
    #[error("Device {0} is already acquired")]
    StreamAlreadyAcquired(String),
    #[error("Stream for device {0} is closed")]
    StreamClosed(String),
    #[error("Frontend went away before answering")]
    FrontendClosed,
    #[error("Invalid operator event: {0}")]
    InvalidEvent(String),
    #[error("Invalid frame data: {0}")]
    InvalidFrame(String),
    #[error("Invalid audio payload: {0}")]
    InvalidAudio(String),
    #[error("No frame after {0:?}")]
    Timeout(Duration),
    #[error("Unsupported capture device: {0}")]
    UnsupportedDevice(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

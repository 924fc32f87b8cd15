pub mod annotate;
pub mod capture;
pub mod clipboard;
pub mod display;
pub mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

use capture::ImageFormat;
use display::Teardown;

pub use error::{GlimpseError, Result};

/// Prefix for environment overrides, e.g. `GLIMPSE__CAPTURE__WARMUP_MS=0`
pub const ENV_PREFIX: &str = "GLIMPSE";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// `test-pattern`, `auto` or a `/dev/videoN` path
    pub device: String,
    pub width: u32,
    pub height: u32,
    /// JPEG quality of captured frames, 1..=100
    pub quality: u8,
    pub buffer_count: u32, // V4L2 mmap buffers
    /// Time after opening before the stream hands out frames
    pub warmup_ms: u64,
    /// Default wait between a frame request and the grab
    pub settle_ms: u64,
    /// Poll interval while the stream is not ready
    pub backoff_ms: u64,
    /// Upper bound on polling for a frame; `None` waits forever
    pub frame_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Encoding used for images put on a surface
    pub format: ImageFormat,
    pub teardown: Teardown,
    /// Rendered size relative to image size (headless frontend)
    pub scale: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: capture::source::TEST_PATTERN.into(),
            width: 800,
            height: 600,
            quality: 80,
            buffer_count: 4,
            warmup_ms: 1_000,
            settle_ms: 100,
            backoff_ms: 50,
            frame_timeout_ms: Some(10_000),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            teardown: Teardown::Remove,
            scale: 1.0,
        }
    }
}

impl Config {
    /// Defaults, then an optional TOML file, then `GLIMPSE__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

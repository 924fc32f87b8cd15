//! Live visual sources a presenter can own

use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use tokio::time::Instant;
use tracing::debug;

use crate::{CaptureConfig, GlimpseError, Result};

/// A camera-like stream that stays open between grabs.
pub trait LiveSource: Send {
    /// Device name, used to lease exclusive access
    fn device(&self) -> &str;

    fn open(&mut self) -> Result<()>;

    /// Grab the current frame. `SurfaceNotReady` while the stream warms up.
    fn grab(&mut self) -> Result<DynamicImage>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}

pub const TEST_PATTERN: &str = "test-pattern";

/// Synthetic source: a moving gradient, one step per grab
pub struct TestPattern {
    width: u32,
    height: u32,
    warmup: Duration,
    opened_at: Option<Instant>,
    tick: u32,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            warmup: Duration::ZERO,
            opened_at: None,
            tick: 0,
        }
    }

    /// Refuse to hand out frames until `warmup` has passed since `open`
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }
}

impl LiveSource for TestPattern {
    fn device(&self) -> &str {
        TEST_PATTERN
    }

    fn open(&mut self) -> Result<()> {
        debug!("Opening test pattern {}x{}", self.width, self.height);
        self.opened_at = Some(Instant::now());
        self.tick = 0;
        Ok(())
    }

    fn grab(&mut self) -> Result<DynamicImage> {
        let opened_at = self
            .opened_at
            .ok_or_else(|| GlimpseError::StreamClosed(TEST_PATTERN.into()))?;
        if opened_at.elapsed() < self.warmup {
            return Err(GlimpseError::SurfaceNotReady);
        }

        let shift = self.tick;
        self.tick = self.tick.wrapping_add(1);
        let (w, h) = (self.width.max(1), self.height.max(1));
        let frame = RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                ((x + shift % w) % w * 255 / w) as u8,
                (y * 255 / h) as u8,
                (shift % 256) as u8,
            ])
        });
        Ok(DynamicImage::ImageRgb8(frame))
    }

    fn close(&mut self) {
        self.opened_at = None;
    }

    fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }
}

/// Pick a source for the configured device name
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn LiveSource>> {
    match config.device.as_str() {
        TEST_PATTERN => Ok(Box::new(
            TestPattern::new(config.width, config.height)
                .with_warmup(Duration::from_millis(config.warmup_ms)),
        )),
        #[cfg(feature = "v4l2")]
        "auto" => {
            let found = super::v4l2::auto_detect_device()?;
            Ok(Box::new(super::v4l2::V4l2Source::new(found, config)?))
        }
        #[cfg(feature = "v4l2")]
        path if path.starts_with("/dev/video") => {
            let found = super::v4l2::FoundDevice::probe(path)?;
            Ok(Box::new(super::v4l2::V4l2Source::new(found, config)?))
        }
        other => Err(GlimpseError::UnsupportedDevice(other.to_string())),
    }
}

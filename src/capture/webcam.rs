//! Single-shot capture: preview, wait for a click, keep that frame

use std::time::Duration;

use image::imageops::FilterType;
use tracing::{debug, info, instrument};

use super::codec;
use super::frame::{CapturedFrame, ImageFormat};
use super::grabber::poll_until_ready;
use super::lease::DeviceLeases;
use super::source::LiveSource;
use crate::display::{Bridge, Expect, OperatorEvent, SurfaceContent, SurfaceId};
use crate::{CaptureConfig, GlimpseError, Result};

const PROMPT: &str = "Click on the image to save!";

/// Snapshot presenter. One capture per instance.
pub struct Webcam {
    source: Box<dyn LiveSource>,
    leases: DeviceLeases,
    bridge: Bridge,
    width: u32,
    height: u32,
    quality: u8,
    backoff: Duration,
    timeout: Option<Duration>,
    used: bool,
}

impl Webcam {
    pub fn new(
        source: Box<dyn LiveSource>,
        leases: DeviceLeases,
        bridge: Bridge,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            source,
            leases,
            bridge,
            width: config.width,
            height: config.height,
            quality: config.quality,
            backoff: Duration::from_millis(config.backoff_ms.max(1)),
            timeout: config.frame_timeout_ms.map(Duration::from_millis),
            used: false,
        }
    }

    /// Suspends until the operator clicks the preview; no timeout on the
    /// click. A stream still warming up is polled like `VideoGrabber`.
    #[instrument(skip(self), fields(device = self.source.device()))]
    pub async fn capture(&mut self) -> Result<CapturedFrame> {
        if self.used {
            return Err(GlimpseError::SessionMisuse("webcam snapshot already taken"));
        }
        let _lease = self.leases.acquire(self.source.device())?;
        self.source.open()?;
        self.used = true;
        let surface = SurfaceId::new();
        let result = self.shoot(surface).await;

        self.source.close();
        // The surface may be gone already if the frontend closed
        if let Err(e) = self.bridge.remove(surface) {
            debug!("Could not remove preview {}: {}", surface, e);
        }
        result
    }

    async fn shoot(&mut self, surface: SurfaceId) -> Result<CapturedFrame> {
        let preview = match self.source.grab() {
            Ok(frame) => SurfaceContent::Image {
                image: codec::encode(&frame, ImageFormat::Jpeg)?,
                caption: Some(PROMPT.to_string()),
            },
            Err(GlimpseError::SurfaceNotReady) => SurfaceContent::Text(PROMPT.to_string()),
            Err(e) => return Err(e),
        };
        self.bridge.show(surface, preview)?;

        loop {
            match self.bridge.next_event(surface, Expect::Trigger).await? {
                OperatorEvent::Trigger | OperatorEvent::Click { .. } => break,
                other => debug!("Waiting for a click, ignoring {:?}", other),
            }
        }

        let source = &mut self.source;
        let frame = poll_until_ready(self.backoff, self.timeout, || source.grab())
            .await?
            .resize_exact(self.width, self.height, FilterType::Triangle);
        let encoded = codec::encode_jpeg(&frame, self.quality)?;
        metrics::counter!("frames_captured").increment(1);
        info!(
            "Snapshot taken: {}x{}, {} bytes",
            encoded.width,
            encoded.height,
            encoded.data.len()
        );
        Ok(CapturedFrame::new(encoded, 1))
    }
}

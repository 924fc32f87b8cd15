//! Continuous capture from one open stream

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, trace, warn};

use super::codec;
use super::frame::CapturedFrame;
use super::lease::{DeviceLeases, Lease};
use super::source::LiveSource;
use crate::display::{Bridge, SurfaceContent, SurfaceId};
use crate::{CaptureConfig, GlimpseError, Result};

/// Handle over a running stream. Belongs to the session that started it.
pub struct VideoGrabber {
    source: Box<dyn LiveSource>,
    lease: Option<Lease>,
    bridge: Bridge,
    surface: SurfaceId,
    ready_at: Instant,
    backoff: Duration,
    timeout: Option<Duration>,
    quality: u8,
    sequence: u64,
}

impl VideoGrabber {
    /// Open the stream and show its preview. Frames are available after the
    /// configured warm-up.
    pub fn start(
        mut source: Box<dyn LiveSource>,
        leases: &DeviceLeases,
        bridge: Bridge,
        config: &CaptureConfig,
    ) -> Result<Self> {
        let lease = leases.acquire(source.device())?;
        source.open()?;

        let surface = SurfaceId::new();
        if let Err(e) = bridge.show(surface, SurfaceContent::Text("Starting camera...".into())) {
            source.close();
            return Err(e);
        }
        info!(
            "Video grabber started on {} (warm-up {} ms)",
            source.device(),
            config.warmup_ms
        );

        Ok(Self {
            source,
            lease: Some(lease),
            bridge,
            surface,
            ready_at: Instant::now() + Duration::from_millis(config.warmup_ms),
            backoff: Duration::from_millis(config.backoff_ms.max(1)),
            timeout: config.frame_timeout_ms.map(Duration::from_millis),
            quality: config.quality,
            sequence: 0,
        })
    }

    pub fn is_running(&self) -> bool {
        self.lease.is_some() && self.source.is_open()
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// One attempt. `SurfaceNotReady` until the stream has warmed up.
    pub fn try_next_frame(&mut self) -> Result<CapturedFrame> {
        self.ensure_running()?;
        if Instant::now() < self.ready_at {
            return Err(GlimpseError::SurfaceNotReady);
        }

        let image = self.source.grab()?;
        let encoded = codec::encode_jpeg(&image, self.quality)?;
        self.sequence += 1;
        self.bridge.replace(
            self.surface,
            SurfaceContent::Image {
                image: encoded.clone(),
                caption: None,
            },
        )?;
        metrics::counter!("frames_captured").increment(1);
        Ok(CapturedFrame::new(encoded, self.sequence))
    }

    /// Wait `settle`, then poll with backoff until the stream yields a frame
    #[instrument(skip(self), fields(device = self.source.device()))]
    pub async fn next_frame(&mut self, settle: Duration) -> Result<CapturedFrame> {
        self.ensure_running()?;
        let requested = Instant::now();
        sleep(settle).await;

        let frame = poll_until_ready(self.backoff, self.timeout, || self.try_next_frame()).await?;
        let waited = requested.elapsed();
        metrics::histogram!("frame_wait_ms").record(waited.as_secs_f64() * 1000.0);
        debug!("Frame {} after {:?}", frame.meta.sequence, waited);
        Ok(frame)
    }

    /// Close the stream and remove the preview. Later grabs are misuse.
    pub fn stop(&mut self) -> Result<()> {
        let Some(lease) = self.lease.take() else {
            return Ok(());
        };
        self.source.close();
        drop(lease);
        info!("Video grabber stopped after {} frames", self.sequence);
        self.bridge.remove(self.surface)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(GlimpseError::SessionMisuse("video grabber used after stop"))
        }
    }
}

/// Retry `attempt` every `backoff` while it reports `SurfaceNotReady`.
/// Gives up with `Timeout` once `limit` has passed.
pub(super) async fn poll_until_ready<T>(
    backoff: Duration,
    limit: Option<Duration>,
    mut attempt: impl FnMut() -> Result<T>,
) -> Result<T> {
    let polling_since = Instant::now();
    loop {
        match attempt() {
            Err(GlimpseError::SurfaceNotReady) => {
                let waited = polling_since.elapsed();
                if limit.is_some_and(|limit| waited >= limit) {
                    warn!("No frame after {:?}", waited);
                    return Err(GlimpseError::Timeout(waited));
                }
                trace!("Stream not ready, retrying in {:?}", backoff);
                sleep(backoff).await;
            }
            other => return other,
        }
    }
}

impl Drop for VideoGrabber {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::{TestPattern, TEST_PATTERN};
    use crate::display::{bridge, Command};

    fn config(warmup_ms: u64) -> CaptureConfig {
        CaptureConfig {
            width: 16,
            height: 12,
            warmup_ms,
            backoff_ms: 50,
            frame_timeout_ms: Some(5_000),
            ..CaptureConfig::default()
        }
    }

    fn start(leases: &DeviceLeases, bridge: Bridge, config: &CaptureConfig) -> VideoGrabber {
        let source = Box::new(TestPattern::new(config.width, config.height));
        VideoGrabber::start(source, leases, bridge, config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn no_frame_before_warmup() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let mut grabber = start(&leases, bridge, &config(1_000));
        assert!(matches!(
            grabber.try_next_frame(),
            Err(GlimpseError::SurfaceNotReady)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn early_request_polls_until_warm() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let mut grabber = start(&leases, bridge, &config(1_000));

        let begin = Instant::now();
        let frame = grabber.next_frame(Duration::from_millis(100)).await.unwrap();
        let waited = begin.elapsed();
        assert!(waited >= Duration::from_millis(1_000), "{waited:?}");
        assert!(waited < Duration::from_millis(1_100), "{waited:?}");
        assert_eq!(frame.meta.sequence, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn warm_request_takes_the_settle_delay() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let mut grabber = start(&leases, bridge, &config(200));
        sleep(Duration::from_millis(250)).await;

        let settle = Duration::from_millis(75);
        let begin = Instant::now();
        grabber.next_frame(settle).await.unwrap();
        let waited = begin.elapsed();
        assert!(waited >= settle);
        assert!(waited < settle + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn frames_arrive_in_request_order() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let mut grabber = start(&leases, bridge, &config(0));
        let mut seen = Vec::new();
        for _ in 0..3 {
            let frame = grabber.next_frame(Duration::from_millis(10)).await.unwrap();
            assert_eq!((frame.meta.width, frame.meta.height), (16, 12));
            seen.push(frame.meta.sequence);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_stream_times_out() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let config = CaptureConfig {
            frame_timeout_ms: Some(500),
            ..config(60_000)
        };
        let mut grabber = start(&leases, bridge, &config);
        let err = grabber.next_frame(Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, GlimpseError::Timeout(d) if d >= Duration::from_millis(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn use_after_stop_is_misuse_and_frees_device() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let mut grabber = start(&leases, bridge.clone(), &config(0));
        assert!(leases.is_held(TEST_PATTERN));

        grabber.stop().unwrap();
        grabber.stop().unwrap();
        assert!(!leases.is_held(TEST_PATTERN));
        assert!(matches!(
            grabber.next_frame(Duration::ZERO).await,
            Err(GlimpseError::SessionMisuse(_))
        ));
        assert!(matches!(
            grabber.try_next_frame(),
            Err(GlimpseError::SessionMisuse(_))
        ));

        // Device can be taken again
        let _again = start(&leases, bridge, &config(0));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_running_grabber_frees_device_and_preview() {
        let (bridge, endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let grabber = start(&leases, bridge, &config(0));
        let surface = grabber.surface();
        assert!(leases.is_held(TEST_PATTERN));

        drop(grabber);
        assert!(!leases.is_held(TEST_PATTERN));
        assert!(matches!(endpoint.recv(), Some(Command::Show { surface: s, .. }) if s == surface));
        assert!(matches!(endpoint.recv(), Some(Command::Remove { surface: s }) if s == surface));
        assert!(endpoint.recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_grabber_on_same_device_is_refused() {
        let (bridge, _endpoint) = bridge::channel();
        let leases = DeviceLeases::new();
        let cfg = config(0);
        let _first = start(&leases, bridge.clone(), &cfg);
        let source = Box::new(TestPattern::new(4, 4));
        assert!(matches!(
            VideoGrabber::start(source, &leases, bridge, &cfg),
            Err(GlimpseError::StreamAlreadyAcquired(_))
        ));
    }
}
